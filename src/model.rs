use serde::Deserialize;

/// One catalog entry: a currency and its reference images.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrencyRecord {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub flag_url: String,
    pub banknote_images: Vec<String>,
    pub sort_order: Option<i64>,

    // Lower-cased copies used only for search matching.
    pub normalized_code: String,
    pub normalized_name: String,
}

impl CurrencyRecord {
    /// Build a record from stored column values, recomputing the derived fields.
    pub fn from_columns(
        id: i64,
        code: String,
        name: String,
        flag_url: String,
        banknote_url: &str,
        sort_order: Option<i64>,
    ) -> Self {
        let normalized_code = code.to_lowercase();
        let normalized_name = name.to_lowercase();
        Self {
            id,
            code,
            name,
            flag_url,
            banknote_images: parse_banknote_images(banknote_url),
            sort_order,
            normalized_code,
            normalized_name,
        }
    }

    pub fn banknote_count(&self) -> usize {
        self.banknote_images.len()
    }

    pub fn first_banknote(&self) -> Option<&str> {
        self.banknote_images.first().map(String::as_str)
    }

    /// Whether the (already normalized) search term matches this record.
    pub fn matches(&self, term: &str) -> bool {
        term.is_empty() || self.normalized_code.contains(term) || self.normalized_name.contains(term)
    }
}

/// Decode the `banknote_url` column.
///
/// The column holds either a JSON array of URLs or a single bare URL. Anything
/// that does not parse as an array is treated as a one-element list.
pub fn parse_banknote_images(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| match v {
                serde_json::Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => vec![trimmed.to_string()],
    }
}

/// Encode an image list for the `banknote_url` column.
pub fn encode_banknote_images(images: &[String]) -> String {
    serde_json::to_string(images).unwrap_or_else(|_| "[]".to_string())
}

/// Aggregate counts shown in the catalog header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogTotals {
    pub currency_count: usize,
    pub banknote_count: usize,
    pub filtered_count: usize,
}

/// A new entry to insert, as read from an import file.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCurrency {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub flag_url: String,
    #[serde(default)]
    pub banknote_images: Vec<String>,
    /// Legacy single-column form; used when `banknote_images` is empty.
    #[serde(default)]
    pub banknote_url: Option<String>,
    #[serde(default)]
    pub sort_order: Option<i64>,
}

impl NewCurrency {
    pub fn images(&self) -> Vec<String> {
        if !self.banknote_images.is_empty() {
            return self.banknote_images.clone();
        }
        self.banknote_url
            .as_deref()
            .map(parse_banknote_images)
            .unwrap_or_default()
    }
}

#[cfg(test)]
pub(crate) fn record(id: i64, code: &str, name: &str) -> CurrencyRecord {
    CurrencyRecord::from_columns(
        id,
        code.to_string(),
        name.to_string(),
        format!("https://flags.example/{}.png", code.to_lowercase()),
        &format!("[\"https://notes.example/{}-1.png\"]", code.to_lowercase()),
        None,
    )
}
