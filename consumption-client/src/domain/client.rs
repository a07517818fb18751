use serde::Serialize;

/// A row of the `clients` directory table, keyed by `external_id`.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ClientRecord {
    pub external_id: String,
    pub name: Option<String>,
    pub street: Option<String>,
    pub street_number: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
}

impl ClientRecord {
    /// Street and number joined by a single space, skipping blank parts.
    pub fn address(&self) -> Option<String> {
        let parts: Vec<&str> = [self.street.as_deref(), self.street_number.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(street: Option<&str>, number: Option<&str>) -> ClientRecord {
        ClientRecord {
            external_id: "A001".to_string(),
            name: None,
            street: street.map(str::to_string),
            street_number: number.map(str::to_string),
            neighborhood: None,
            city: None,
            province: None,
        }
    }

    #[test]
    fn address_joins_street_and_number() {
        assert_eq!(
            record(Some("Calle Mayor"), Some("12")).address().as_deref(),
            Some("Calle Mayor 12")
        );
    }

    #[test]
    fn address_skips_blank_parts() {
        assert_eq!(record(Some("Calle Mayor"), Some("  ")).address().as_deref(), Some("Calle Mayor"));
        assert_eq!(record(None, None).address(), None);
    }
}
