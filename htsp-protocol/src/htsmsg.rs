//! The self-describing field map exchanged on an HTSP connection.

use bytes::Bytes;

/// A single field value within an [`HtsMsg`].
#[derive(Debug, Clone, PartialEq)]
pub enum HtsValue {
    /// Signed 64-bit integer.
    S64(i64),
    /// UTF-8 string.
    Str(String),
    /// Raw binary blob.
    Bin(Bytes),
    /// Nested field map.
    Map(HtsMsg),
    /// Ordered list of values.
    List(Vec<HtsValue>),
}

/// A named field map, the unit of exchange on an HTSP connection.
///
/// Field order is preserved as inserted; lookups are by name. Duplicate
/// names are not rejected, `get` returns the first match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HtsMsg {
    fields: Vec<(String, HtsValue)>,
}

impl HtsMsg {
    /// Create an empty message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a message carrying a `method` field, the shape of every
    /// named request and asynchronous push.
    pub fn method(method: &str) -> Self {
        let mut msg = Self::new();
        msg.put_str("method", method);
        msg
    }

    /// Append a field.
    pub fn put(&mut self, name: &str, value: HtsValue) {
        self.fields.push((name.to_string(), value));
    }

    pub fn put_s64(&mut self, name: &str, value: i64) {
        self.put(name, HtsValue::S64(value));
    }

    pub fn put_u32(&mut self, name: &str, value: u32) {
        self.put(name, HtsValue::S64(value as i64));
    }

    pub fn put_str(&mut self, name: &str, value: &str) {
        self.put(name, HtsValue::Str(value.to_string()));
    }

    pub fn put_bin(&mut self, name: &str, value: Bytes) {
        self.put(name, HtsValue::Bin(value));
    }

    pub fn put_map(&mut self, name: &str, value: HtsMsg) {
        self.put(name, HtsValue::Map(value));
    }

    pub fn put_list(&mut self, name: &str, value: Vec<HtsValue>) {
        self.put(name, HtsValue::List(value));
    }

    /// Look up a field by name.
    pub fn get(&self, name: &str) -> Option<&HtsValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn get_s64(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            HtsValue::S64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_u32(&self, name: &str) -> Option<u32> {
        u32::try_from(self.get_s64(name)?).ok()
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            HtsValue::Str(v) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn get_bin(&self, name: &str) -> Option<&Bytes> {
        match self.get(name)? {
            HtsValue::Bin(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_map(&self, name: &str) -> Option<&HtsMsg> {
        match self.get(name)? {
            HtsValue::Map(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_list(&self, name: &str) -> Option<&[HtsValue]> {
        match self.get(name)? {
            HtsValue::List(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// All fields in insertion order.
    pub fn fields(&self) -> &[(String, HtsValue)] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_accessors() {
        let mut msg = HtsMsg::method("subscribe");
        msg.put_u32("channelId", 5);
        msg.put_s64("time", -1);
        msg.put_bin("challenge", Bytes::from_static(&[1, 2, 3]));

        assert_eq!(msg.get_str("method"), Some("subscribe"));
        assert_eq!(msg.get_u32("channelId"), Some(5));
        assert_eq!(msg.get_s64("time"), Some(-1));
        // Negative values do not coerce to u32.
        assert_eq!(msg.get_u32("time"), None);
        assert_eq!(msg.get_bin("challenge").map(|b| b.len()), Some(3));
        assert_eq!(msg.get("missing"), None);
    }

    #[test]
    fn test_wrong_type_returns_none() {
        let mut msg = HtsMsg::new();
        msg.put_str("seq", "not-a-number");
        assert_eq!(msg.get_s64("seq"), None);
    }
}
