use serde::Deserialize;
use serde::Serialize;

use crate::ProtocolError;
use crate::query;

/// Optional sampling parameters forwarded with `/ask`.
///
/// `None` means "let the server pick its default"; such fields never appear
/// on the wire. The same goes for non-finite floats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u64>,
}

impl GenerationParams {
    /// Query pairs in wire order, present values only.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(4);
        if let Some(t) = self.temperature.filter(|t| t.is_finite()) {
            pairs.push((query::TEMPERATURE, t.to_string()));
        }
        if let Some(n) = self.max_tokens {
            pairs.push((query::MAX_TOKENS, n.to_string()));
        }
        if let Some(p) = self.top_p.filter(|p| p.is_finite()) {
            pairs.push((query::TOP_P, p.to_string()));
        }
        if let Some(k) = self.top_k {
            pairs.push((query::TOP_K, k.to_string()));
        }
        pairs
    }

    /// Reject values no provider accepts. The server applies the tighter
    /// per-provider limits.
    pub fn validate(&self) -> crate::Result<()> {
        check_float("temp", self.temperature, 0.0, 2.0, "0.0-2.0")?;
        check_float("top_p", self.top_p, 0.0, 1.0, "0.0-1.0")?;
        if let Some(k) = self.top_k
            && k > 500
        {
            return Err(ProtocolError::OutOfRange {
                field: "top_k",
                range: "0-500",
            });
        }
        Ok(())
    }
}

fn check_float(
    field: &'static str,
    value: Option<f64>,
    min: f64,
    max: f64,
    range: &'static str,
) -> crate::Result<()> {
    let Some(v) = value else {
        return Ok(());
    };
    if !v.is_finite() {
        return Err(ProtocolError::NotFinite { field });
    }
    if !(min..=max).contains(&v) {
        return Err(ProtocolError::OutOfRange { field, range });
    }
    Ok(())
}
