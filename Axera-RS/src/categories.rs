use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Label vocabularies for structured interrogation: category name to the
/// ordered candidate labels the service should choose from. Categories keep
/// the order they were added in, which is the order they go over the wire.
///
/// Names and labels are trimmed on the way in; blank names, blank labels
/// and categories without any label are dropped, so an `is_empty()` map is
/// exactly "nothing worth asking about".
///
/// # Example
/// ```
/// use axera_rs::Categories;
///
/// let cats = Categories::from_rows([
///     ("gender", "man, woman"),
///     ("hair", "black, blonde, pink"),
///     ("", "ignored"),
/// ]);
/// assert_eq!(cats.len(), 2);
/// assert_eq!(cats.get("hair").unwrap(), ["black", "blonde", "pink"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Categories(IndexMap<String, Vec<String>>);

impl Categories {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a category. A later insert with the same name replaces the earlier
    /// labels but keeps the original position.
    pub fn insert<I, S>(mut self, name: impl AsRef<str>, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let name = name.as_ref().trim();
        let labels: Vec<String> = labels
            .into_iter()
            .map(|l| l.as_ref().trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
        if !name.is_empty() && !labels.is_empty() {
            self.0.insert(name.to_string(), labels);
        }
        self
    }

    /// Build from `(name, "label, label, ...")` rows as typed into a form.
    pub fn from_rows<I, N, V>(rows: I) -> Self
    where
        I: IntoIterator<Item = (N, V)>,
        N: AsRef<str>,
        V: AsRef<str>,
    {
        rows.into_iter().fold(Self::new(), |cats, (name, values)| {
            cats.insert(name, values.as_ref().split(','))
        })
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.0.get(name).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rows_trimmed_and_split() {
        let cats = Categories::from_rows([("  gender ", " man ,woman ,, ")]);
        assert_eq!(cats.get("gender").unwrap(), ["man", "woman"]);
    }

    #[test]
    fn test_blank_rows_dropped() {
        let cats = Categories::from_rows([("", "a, b"), ("hair", "   "), ("eyes", " , ,")]);
        assert!(cats.is_empty());
    }

    #[test]
    fn test_duplicate_name_last_wins() {
        let cats = Categories::new()
            .insert("hair", ["black"])
            .insert("hair", ["pink", "blonde"]);
        assert_eq!(cats.len(), 1);
        assert_eq!(cats.get("hair").unwrap(), ["pink", "blonde"]);
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let cats = Categories::new().insert("gender", ["man", "woman"]);
        assert_eq!(
            serde_json::to_value(&cats).unwrap(),
            json!({"gender": ["man", "woman"]})
        );
    }

    #[test]
    fn test_rows_keep_entry_order() {
        let cats = Categories::from_rows([("hair", "black"), ("age", "young, old"), ("eyes", "blue")]);
        let names: Vec<&str> = cats.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["hair", "age", "eyes"]);

        let wire = serde_json::to_string(&cats).unwrap();
        assert_eq!(
            wire,
            r#"{"hair":["black"],"age":["young","old"],"eyes":["blue"]}"#
        );
    }

    #[test]
    fn test_replaced_category_keeps_position() {
        let cats = Categories::new()
            .insert("hair", ["black"])
            .insert("age", ["young"])
            .insert("hair", ["pink"]);
        let names: Vec<&str> = cats.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["hair", "age"]);
        assert_eq!(cats.get("hair").unwrap(), ["pink"]);
    }
}
