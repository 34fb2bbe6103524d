use serde::ser::{Serialize, SerializeMap, Serializer};

/// One decoded row: ordered field/value pairs plus the page it came from
///
/// The field set is inferred per page, so two records of the same crawl may
/// carry different fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
    page: u32,
}

impl Record {
    pub fn new(page: u32) -> Self {
        Self {
            fields: Vec::new(),
            page,
        }
    }

    /// Builds a record from field/value pairs
    pub fn from_pairs<I, K, V>(page: u32, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut record = Self::new(page);
        for (name, value) in pairs {
            record.insert(name, value);
        }
        record
    }

    /// Sets a field, replacing any previous value while keeping its position
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some(field) => field.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }

    /// Fields in insertion order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Page index the record was extracted from
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        for (name, value) in &self.fields {
            if name != "page" {
                map.serialize_entry(name, value)?;
            }
        }
        map.serialize_entry("page", &self.page)?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_order_and_replaces() {
        let mut record = Record::new(3);
        record.insert("序号", "1");
        record.insert("企业名称", "甲公司");
        record.insert("序号", "2");

        let names: Vec<&str> = record.fields().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["序号", "企业名称"]);
        assert_eq!(record.get("序号"), Some("2"));
        assert_eq!(record.page(), 3);
        assert_eq!(record.len(), 2);
    }

    #[test]
    fn test_serializes_as_ordered_object_with_page() {
        let record = Record::from_pairs(2, [("企业名称", "乙公司"), ("登记状态", "存续")]);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"企业名称":"乙公司","登记状态":"存续","page":2}"#);
    }
}
