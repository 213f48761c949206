//! Typed access to string attributes.
//!
//! Every parser is strict: surrounding whitespace is tolerated, anything
//! else that is not exactly the expected syntax is an
//! [`InvalidAttribute`](CompileError::InvalidAttribute).

use heapreel_core::{Color, Micros};

use crate::error::CompileError;
use crate::node::{Element, Node};

/// Attribute reader bound to one node.
pub(crate) struct Attrs<'a> {
    element: Element,
    node: &'a Node,
}

impl<'a> Attrs<'a> {
    /// Check `node` against the vocabulary of `element`.
    pub(crate) fn new(element: Element, node: &'a Node) -> Result<Self, CompileError> {
        let allowed = element.attributes();
        if let Some(name) = node
            .attributes
            .keys()
            .find(|k| !allowed.contains(&k.as_str()))
        {
            return Err(CompileError::UnknownAttribute {
                element: element.as_str(),
                attribute: name.clone(),
            });
        }
        Ok(Self { element, node })
    }

    pub(crate) fn has(&self, name: &str) -> bool {
        self.node.attributes.contains_key(name)
    }

    pub(crate) fn str(&self, name: &'static str) -> Option<&'a str> {
        self.node.attributes.get(name).map(String::as_str)
    }

    pub(crate) fn require_str(&self, name: &'static str) -> Result<&'a str, CompileError> {
        self.str(name).ok_or_else(|| self.missing(name))
    }

    pub(crate) fn missing(&self, name: &'static str) -> CompileError {
        CompileError::MissingAttribute {
            element: self.element.as_str(),
            attribute: name,
        }
    }

    pub(crate) fn invalid(
        &self,
        name: &'static str,
        value: &str,
        reason: impl Into<String>,
    ) -> CompileError {
        CompileError::InvalidAttribute {
            element: self.element.as_str(),
            attribute: name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn u32(&self, name: &'static str) -> Result<Option<u32>, CompileError> {
        self.str(name)
            .map(|raw| {
                parse_u32(raw)
                    .ok_or_else(|| self.invalid(name, raw, "expected an unsigned 32-bit integer"))
            })
            .transpose()
    }

    pub(crate) fn require_u32(&self, name: &'static str) -> Result<u32, CompileError> {
        self.u32(name)?.ok_or_else(|| self.missing(name))
    }

    /// A byte count that must be at least one.
    pub(crate) fn size(&self, name: &'static str) -> Result<Option<u32>, CompileError> {
        match self.u32(name)? {
            Some(0) => Err(self.invalid(name, "0", "size must be at least 1")),
            other => Ok(other),
        }
    }

    pub(crate) fn duration(&self, name: &'static str) -> Result<Option<Micros>, CompileError> {
        self.str(name)
            .map(|raw| {
                parse_duration(raw).ok_or_else(|| {
                    self.invalid(name, raw, "expected a non-negative duration in ms")
                })
            })
            .transpose()
    }

    pub(crate) fn color(&self, name: &'static str) -> Result<Option<Color>, CompileError> {
        self.str(name)
            .map(|raw| {
                parse_color(raw)
                    .ok_or_else(|| self.invalid(name, raw, "expected a color <= 0xffffff"))
            })
            .transpose()
    }

    pub(crate) fn alpha(&self, name: &'static str) -> Result<Option<f64>, CompileError> {
        self.str(name)
            .map(|raw| match raw.trim().parse::<f64>() {
                Ok(v) if v.is_finite() && (0.0..=1.0).contains(&v) => Ok(v),
                _ => Err(self.invalid(name, raw, "expected a number in [0, 1]")),
            })
            .transpose()
    }
}

/// Decimal or `0x`-prefixed hexadecimal.
pub fn parse_u32(raw: &str) -> Option<u32> {
    let s = raw.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return u32::from_str_radix(hex, 16).ok();
    }
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Milliseconds, optionally suffixed `ms`, or seconds suffixed `s`.
///
/// ```
/// use heapreel_core::Micros;
/// use heapreel_workload::attr::parse_duration;
///
/// assert_eq!(parse_duration("250"), Some(Micros(250_000)));
/// assert_eq!(parse_duration("0.5ms"), Some(Micros(500)));
/// assert_eq!(parse_duration("2s"), Some(Micros(2_000_000)));
/// assert_eq!(parse_duration("-1"), None);
/// ```
pub fn parse_duration(raw: &str) -> Option<Micros> {
    let s = raw.trim();
    let (number, scale) = if let Some(ms) = s.strip_suffix("ms") {
        (ms, 1.0)
    } else if let Some(secs) = s.strip_suffix('s') {
        (secs, 1000.0)
    } else {
        (s, 1.0)
    };
    let number = number.trim_end();
    // f64::from_str accepts "inf" and "nan"; only plain decimals are durations.
    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return None;
    }
    let value: f64 = number.parse().ok()?;
    Micros::from_millis_f64(value * scale)
}

/// `#rrggbb`, `0xrrggbb`, or a decimal value.
pub fn parse_color(raw: &str) -> Option<Color> {
    let s = raw.trim();
    let value = match s.strip_prefix('#') {
        Some(hex) if hex.len() == 6 => u32::from_str_radix(hex, 16).ok()?,
        Some(_) => return None,
        None => parse_u32(s)?,
    };
    Color::new(value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u32_accepts_decimal_and_hex() {
        assert_eq!(parse_u32("16"), Some(16));
        assert_eq!(parse_u32(" 0x10 "), Some(16));
        assert_eq!(parse_u32("+16"), None);
        assert_eq!(parse_u32("-1"), None);
        assert_eq!(parse_u32("4294967296"), None);
        assert_eq!(parse_u32(""), None);
    }

    #[test]
    fn durations_reject_garbage() {
        assert_eq!(parse_duration("nan"), None);
        assert_eq!(parse_duration("inf"), None);
        assert_eq!(parse_duration("1e3"), None);
        assert_eq!(parse_duration("ms"), None);
        assert_eq!(parse_duration("0"), Some(Micros::ZERO));
        assert_eq!(parse_duration("1.5 ms"), Some(Micros(1500)));
    }

    #[test]
    fn colors() {
        assert_eq!(parse_color("#ff8000"), Some(Color::from_rgb(0xff8000)));
        assert_eq!(parse_color("0xff8000"), Some(Color::from_rgb(0xff8000)));
        assert_eq!(parse_color("255"), Some(Color::from_rgb(255)));
        assert_eq!(parse_color("#fff"), None);
        assert_eq!(parse_color("0x1000000"), None);
        assert_eq!(parse_color("red"), None);
    }

    #[test]
    fn unknown_attribute_is_reported() {
        let node = Node::malloc(4).attr("align", "8");
        let err = Attrs::new(Element::Malloc, &node).err();
        assert_eq!(
            err,
            Some(CompileError::UnknownAttribute {
                element: "malloc",
                attribute: "align".into()
            })
        );
    }

    #[test]
    fn zero_size_is_invalid() {
        let node = Node::malloc(0);
        let attrs = Attrs::new(Element::Malloc, &node).unwrap();
        assert!(matches!(
            attrs.size("size"),
            Err(CompileError::InvalidAttribute {
                attribute: "size",
                ..
            })
        ));
    }

    #[test]
    fn alpha_range() {
        let node = Node::annotate(heapreel_core::AnnotationKind::Range, 0).attr("alpha", "1.01");
        let attrs = Attrs::new(Element::Annotate, &node).unwrap();
        assert!(attrs.alpha("alpha").is_err());
    }
}
