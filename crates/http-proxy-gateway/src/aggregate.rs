// Path: crates/http-proxy-gateway/src/aggregate.rs
//! Shapes dispatch results into the client-facing response.

use serde::Serialize;
use vproxy_api::WorkerRegistry;
use vproxy_types::app::{WorkerId, WorkerOutcome};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasicResponse {
    pub preds: Vec<f64>,
    pub fqdn: String,
}

/// A [`BasicResponse`] plus registry metadata for each contributing worker,
/// index-aligned with `preds`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RichResponse {
    #[serde(flatten)]
    pub basic: BasicResponse,
    pub uids: Vec<WorkerId>,
    pub ranks: Vec<f64>,
    pub incentives: Vec<f64>,
    pub emissions: Vec<f64>,
    pub hotkeys: Vec<String>,
    pub coldkeys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ForwardResponse {
    Basic(BasicResponse),
    Rich(RichResponse),
}

impl ForwardResponse {
    pub fn preds(&self) -> &[f64] {
        match self {
            Self::Basic(basic) => &basic.preds,
            Self::Rich(rich) => &rich.basic.preds,
        }
    }
}

/// Keeps only valid predictions, in dispatch-result order.
///
/// Returns `None` when no worker produced a valid prediction.
pub fn aggregate(
    results: &[(WorkerId, WorkerOutcome)],
    fqdn: &str,
    rich: bool,
    registry: &dyn WorkerRegistry,
) -> Option<ForwardResponse> {
    let valid: Vec<(WorkerId, f64)> = results
        .iter()
        .filter_map(|(id, outcome)| outcome.prediction().map(|p| (*id, p)))
        .collect();
    if valid.is_empty() {
        return None;
    }

    let basic = BasicResponse {
        preds: valid.iter().map(|(_, p)| *p).collect(),
        fqdn: fqdn.to_owned(),
    };
    if !rich {
        return Some(ForwardResponse::Basic(basic));
    }

    let mut response = RichResponse {
        basic,
        uids: Vec::with_capacity(valid.len()),
        ranks: Vec::with_capacity(valid.len()),
        incentives: Vec::with_capacity(valid.len()),
        emissions: Vec::with_capacity(valid.len()),
        hotkeys: Vec::with_capacity(valid.len()),
        coldkeys: Vec::with_capacity(valid.len()),
    };
    for (id, _) in &valid {
        // Deregistered since dispatch: report neutral metadata.
        let info = registry.worker(*id);
        response.uids.push(*id);
        response.ranks.push(info.as_ref().map_or(0.0, |i| i.rank));
        response
            .incentives
            .push(info.as_ref().map_or(0.0, |i| i.incentive));
        response
            .emissions
            .push(info.as_ref().map_or(0.0, |i| i.emission));
        response
            .hotkeys
            .push(info.as_ref().map(|i| i.hotkey.clone()).unwrap_or_default());
        response
            .coldkeys
            .push(info.map(|i| i.coldkey).unwrap_or_default());
    }
    Some(ForwardResponse::Rich(response))
}
