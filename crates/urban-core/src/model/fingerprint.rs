//! Insumos del fingerprint de una capa.

use serde_json::json;

use crate::hashing::hash_value;

/// Agrupa los insumos que entran al fingerprint de una capa. NO es el
/// fingerprint final (string hash) sino el modelo previo a canonicalizar.
/// `upstream` trae pares (capa, content_hash) en orden topológico; que los
/// dependientes consuman content hashes permite el corte temprano: una
/// recomputación que reproduce el mismo output deja a sus dependientes
/// frescos.
pub struct StageFingerprintInput<'a> {
    pub pipeline_version: &'a str,
    pub stage: &'a str,
    pub base_fingerprint: Option<&'a str>,
    pub upstream: &'a [(String, String)],
    pub aux_fingerprint: Option<&'a str>,
}

impl StageFingerprintInput<'_> {
    /// Hash determinista del conjunto de insumos.
    pub fn hash(&self) -> String {
        let document = json!({
            "pipeline_version": self.pipeline_version,
            "stage": self.stage,
            "base_fingerprint": self.base_fingerprint,
            "upstream": self.upstream,
            "aux_fingerprint": self.aux_fingerprint,
        });
        hash_value(&document)
    }
}
