//! Reduction of EBI NCBI-BLAST+ JSON output to `BlastHit`s.
//!
//! EBI has shipped two JSON layouts over time: the flat one
//! (`hits[].hit_hsps[].hsp_bit_score`) and a nested one
//! (`results.hits[].hsps[].scores.bit_score`). Both are accepted.

use rhesus_common::BlastHit;
use serde_json::Value;

pub const DEFAULT_TOP_HITS: usize = 10;

/// Keep the first `top_n` hits and report the first HSP of each.
/// Hits without HSPs are dropped after the cut, so fewer than `top_n` may come back.
pub fn parse_blast_hits(json: &Value, top_n: usize) -> Vec<BlastHit> {
    let hits = json["hits"]
        .as_array()
        .or_else(|| json["results"]["hits"].as_array());
    let Some(hits) = hits else {
        return Vec::new();
    };

    hits.iter().take(top_n).filter_map(parse_hit).collect()
}

fn parse_hit(hit: &Value) -> Option<BlastHit> {
    let hsp = first_of(hit, &["hit_hsps", "hsps"])?
        .as_array()?
        .first()?;

    let accession = string_of(hit, &["hit_acc", "accession", "hit_id"]);
    let description = string_of(hit, &["hit_desc", "description", "hit_def"]);
    let score = number_of(hsp, &["hsp_bit_score"])
        .or_else(|| hsp["scores"]["bit_score"].as_f64())
        .unwrap_or_default();
    let e_value = number_of(hsp, &["hsp_expect"])
        .or_else(|| hsp["stats"]["evalue"].as_f64())
        .or_else(|| hsp["scores"]["evalue"].as_f64())
        .unwrap_or_default();
    let identity = number_of(hsp, &["hsp_identity", "identity"]).unwrap_or_default();

    Some(BlastHit {
        accession,
        description,
        score,
        e_value: format_evalue(e_value),
        identity: identity / 100.0,
    })
}

fn first_of<'a>(v: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().map(|k| &v[*k]).find(|x| !x.is_null())
}

fn string_of(v: &Value, keys: &[&str]) -> String {
    first_of(v, keys)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn number_of(v: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| match &v[*k] {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Shortest exponent notation with an explicit exponent sign for positive
/// powers: `2e-130`, `1.5e+0`, `0e+0`.
pub fn format_evalue(value: f64) -> String {
    let s = format!("{:e}", value);
    match s.split_once('e') {
        Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
        _ => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_evalue() {
        assert_eq!(format_evalue(2e-130), "2e-130");
        assert_eq!(format_evalue(1.5), "1.5e+0");
        assert_eq!(format_evalue(0.0), "0e+0");
        assert_eq!(format_evalue(3.2e5), "3.2e+5");
    }

    #[test]
    fn test_flat_layout() {
        let json = json!({
            "hits": [{
                "hit_acc": "P01308",
                "hit_desc": "Insulin OS=Homo sapiens",
                "hit_hsps": [
                    { "hsp_bit_score": 226.5, "hsp_expect": 2e-130, "hsp_identity": 100.0 },
                    { "hsp_bit_score": 12.0, "hsp_expect": 1.0, "hsp_identity": 20.0 }
                ]
            }]
        });
        let hits = parse_blast_hits(&json, DEFAULT_TOP_HITS);
        assert_eq!(
            hits,
            vec![BlastHit {
                accession: "P01308".into(),
                description: "Insulin OS=Homo sapiens".into(),
                score: 226.5,
                e_value: "2e-130".into(),
                identity: 1.0,
            }]
        );
    }

    #[test]
    fn test_nested_layout() {
        let json = json!({
            "results": { "hits": [{
                "accession": "P01315",
                "description": "Insulin OS=Sus scrofa",
                "hsps": [{ "scores": { "bit_score": 190 }, "stats": { "evalue": 1.5e-50 }, "identity": 95.5 }]
            }]}
        });
        let hits = parse_blast_hits(&json, DEFAULT_TOP_HITS);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].score, 190.0);
        assert_eq!(hits[0].e_value, "1.5e-50");
        assert!((hits[0].identity - 0.955).abs() < 1e-9);
    }

    #[test]
    fn test_top_n_is_applied_before_skipping_empty_hits() {
        let json = json!({
            "hits": [
                { "hit_desc": "no hsps", "hit_hsps": [] },
                { "hit_desc": "a", "hit_hsps": [{ "hsp_bit_score": 1, "hsp_expect": 1, "hsp_identity": 50 }] },
                { "hit_desc": "b", "hit_hsps": [{ "hsp_bit_score": 1, "hsp_expect": 1, "hsp_identity": 50 }] }
            ]
        });
        let hits = parse_blast_hits(&json, 2);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].description, "a");
    }

    #[test]
    fn test_missing_hits_yield_empty_list() {
        assert!(parse_blast_hits(&json!({}), 10).is_empty());
        assert!(parse_blast_hits(&json!({ "results": {} }), 10).is_empty());
    }
}
