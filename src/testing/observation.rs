//! Values recorded while a scenario runs

use serde::Serialize;

/// One product card as rendered
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObservedItem {
    pub name: String,
    pub description: String,
    pub price: String,
    /// `None` when the image has no `src` attribute
    pub image_src: Option<String>,
}

/// A recorded value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Observed {
    Text(String),
    Attribute(Option<String>),
    Presence(bool),
    Url(String),
    Items(Vec<ObservedItem>),
}

impl Observed {
    /// Short rendering for diagnostics
    pub fn describe(&self) -> String {
        match self {
            Observed::Text(s) | Observed::Url(s) => s.clone(),
            Observed::Attribute(Some(s)) => s.clone(),
            Observed::Attribute(None) => "<absent>".to_string(),
            Observed::Presence(true) => "present".to_string(),
            Observed::Presence(false) => "absent".to_string(),
            Observed::Items(items) => format!("{} items", items.len()),
        }
    }
}

/// A value recorded by one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Observation {
    /// Index of the step that recorded it, counted from 1
    pub step: usize,
    pub key: String,
    pub value: Observed,
}

/// Observations of one scenario, in recording order
///
/// A key may be recorded more than once (a probe before and after a
/// dismissal); lookups return the latest value unless stated otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Observations(Vec<Observation>);

impl Observations {
    pub fn push(&mut self, step: usize, key: String, value: Observed) {
        self.0.push(Observation { step, key, value });
    }

    pub fn iter(&self) -> impl Iterator<Item = &Observation> {
        self.0.iter()
    }

    /// Latest value under a key
    pub fn get(&self, key: &str) -> Option<&Observed> {
        self.0.iter().rev().find(|o| o.key == key).map(|o| &o.value)
    }

    /// Earliest value under a key
    pub fn first(&self, key: &str) -> Option<&Observed> {
        self.0.iter().find(|o| o.key == key).map(|o| &o.value)
    }

    pub fn text(&self, element: &str) -> Option<&str> {
        match self.get(&format!("text:{}", element)) {
            Some(Observed::Text(s)) => Some(s),
            _ => None,
        }
    }

    /// Attribute value; outer `None` if never read, inner if absent
    pub fn attribute(&self, element: &str, attribute: &str) -> Option<Option<&str>> {
        match self.get(&format!("attr:{}:{}", element, attribute)) {
            Some(Observed::Attribute(value)) => Some(value.as_deref()),
            _ => None,
        }
    }

    pub fn presence(&self, element: &str) -> Option<bool> {
        match self.get(&format!("present:{}", element)) {
            Some(Observed::Presence(p)) => Some(*p),
            _ => None,
        }
    }

    pub fn first_presence(&self, element: &str) -> Option<bool> {
        match self.first(&format!("present:{}", element)) {
            Some(Observed::Presence(p)) => Some(*p),
            _ => None,
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self.get("url") {
            Some(Observed::Url(s)) => Some(s),
            _ => None,
        }
    }

    pub fn items(&self, item: &str) -> Option<&[ObservedItem]> {
        match self.get(&format!("items:{}", item)) {
            Some(Observed::Items(items)) => Some(items),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_and_first_presence() {
        let mut obs = Observations::default();
        obs.push(5, "present:error_button".into(), Observed::Presence(true));
        obs.push(7, "present:error_button".into(), Observed::Presence(false));
        assert_eq!(obs.first_presence("error_button"), Some(true));
        assert_eq!(obs.presence("error_button"), Some(false));
        assert_eq!(obs.presence("error"), None);
    }

    #[test]
    fn test_typed_lookups() {
        let mut obs = Observations::default();
        obs.push(1, "url".into(), Observed::Url("https://x/".into()));
        obs.push(2, "attr:password:type".into(), Observed::Attribute(None));
        assert_eq!(obs.url(), Some("https://x/"));
        assert_eq!(obs.attribute("password", "type"), Some(None));
        assert_eq!(obs.attribute("password", "placeholder"), None);
        assert_eq!(obs.text("error"), None);
    }
}
