//! Inline style hand-off
//!
//! The `style` attribute is split into property/value pairs and handed to a
//! declaration sink. Cascade and value parsing belong to the CSS layer.

/// Receiver of inline style declarations
pub trait StyleDeclarationSink {
    fn set_property(&mut self, name: &str, value: &str);
}

/// Split `value` on `;` then `:` and feed each pair to `sink`.
///
/// Empty fragments and fragments without exactly one `:` are skipped.
pub fn parse_style_attribute<S: StyleDeclarationSink + ?Sized>(value: &str, sink: &mut S) {
    for part in value.split(';') {
        if part.trim().is_empty() {
            continue;
        }
        let mut pieces = part.split(':');
        let (Some(name), Some(val), None) = (pieces.next(), pieces.next(), pieces.next()) else {
            tracing::trace!("Skipping malformed style fragment: {:?}", part);
            continue;
        };
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        sink.set_property(name, val.trim());
    }
}

/// Ordered property list parsed from a `style` attribute
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleDeclaration {
    properties: Vec<(String, String)>,
}

impl StyleDeclaration {
    pub fn parse(value: &str) -> Self {
        let mut decl = Self::default();
        parse_style_attribute(value, &mut decl);
        decl
    }

    pub fn get_property_value(&self, name: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Serialized form, `name: value; ...`
    pub fn css_text(&self) -> String {
        self.properties
            .iter()
            .map(|(n, v)| format!("{}: {};", n, v))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl StyleDeclarationSink for StyleDeclaration {
    fn set_property(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        match self.properties.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.properties.push((name, value.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Collect(Vec<(String, String)>);

    impl StyleDeclarationSink for Collect {
        fn set_property(&mut self, name: &str, value: &str) {
            self.0.push((name.to_string(), value.to_string()));
        }
    }

    #[test]
    fn test_split_pairs() {
        let mut sink = Collect::default();
        parse_style_attribute("color:red;width: 10px", &mut sink);
        assert_eq!(
            sink.0,
            vec![
                ("color".to_string(), "red".to_string()),
                ("width".to_string(), "10px".to_string()),
            ]
        );
    }

    #[test]
    fn test_malformed_fragments_skipped() {
        let mut sink = Collect::default();
        parse_style_attribute(";;color;a:b:c; ;height:1px;", &mut sink);
        assert_eq!(sink.0, vec![("height".to_string(), "1px".to_string())]);
    }

    #[test]
    fn test_duplicate_property_last_wins() {
        let decl = StyleDeclaration::parse("color: red; COLOR: blue");
        assert_eq!(decl.len(), 1);
        assert_eq!(decl.get_property_value("color"), Some("blue"));
        assert_eq!(decl.css_text(), "color: blue;");
    }
}
