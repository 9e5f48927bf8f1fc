//! C-compatible API for the scripting layer that drives serving and reports.
//!
//! Ownership rules: a pacer handle returned by `uplift_pacer_new` or
//! `uplift_pacer_new_json` belongs to the caller until it is passed to
//! `uplift_pacer_free`. Pointer arguments are borrowed for the duration of
//! the call only.

use std::ffi::{c_char, CStr};
use std::slice;

use tracing::warn;

use crate::bidding::service as bidding_service;
use crate::common::config::AppCfg;
use crate::common::error::{ErrorCode, UpliftError};
use crate::common::log;
use crate::evaluation::domain::{EvaluationRow, EvaluationSet};
use crate::evaluation::service as evaluation_service;
use crate::inference::domain::UpliftScore;
use crate::pacing::domain::ControllerConfig;
use crate::pacing::service::{PacingController, SharedPacer};

/// Opaque pacer handle.
pub struct PacerHandle {
    pacer: SharedPacer,
}

/// ABI version to coordinate with the host layer.
#[no_mangle]
pub extern "C" fn uplift_api_version() -> u32 {
    1
}

/// Load configuration from the environment and install the log subscriber.
///
/// Returns an `ErrorCode`; an already installed subscriber is left in place.
#[no_mangle]
pub extern "C" fn uplift_init() -> u32 {
    match AppCfg::load() {
        Ok(cfg) => {
            log::init(cfg.log_format, &cfg.log_level);
            ErrorCode::Ok as u32
        }
        Err(err) => err.code() as u32,
    }
}

/// Create a pacer with the reference floor and no ceiling. Null on invalid config.
#[no_mangle]
pub extern "C" fn uplift_pacer_new(
    kp: f64,
    ki: f64,
    kd: f64,
    target_spend_rate: f64,
) -> *mut PacerHandle {
    match PacingController::new(ControllerConfig::new(kp, ki, kd, target_spend_rate)) {
        Ok(controller) => Box::into_raw(Box::new(PacerHandle {
            pacer: SharedPacer::new(controller),
        })),
        Err(err) => {
            warn!(%err, "pacer rejected");
            std::ptr::null_mut()
        }
    }
}

/// Create a pacer from a JSON-encoded controller configuration.
///
/// Accepts every option, including ceiling and anti-windup mode. Null when
/// the pointer is null, the text is not UTF-8 JSON, or validation fails.
#[no_mangle]
pub extern "C" fn uplift_pacer_new_json(cfg: *const c_char) -> *mut PacerHandle {
    if cfg.is_null() {
        return std::ptr::null_mut();
    }
    let raw = unsafe { CStr::from_ptr(cfg) };
    let parsed = raw
        .to_str()
        .map_err(|err| UpliftError::invalid_input(format!("config is not utf-8: {err}")))
        .and_then(|text| Ok(serde_json::from_str::<ControllerConfig>(text)?))
        .and_then(PacingController::new);
    match parsed {
        Ok(controller) => Box::into_raw(Box::new(PacerHandle {
            pacer: SharedPacer::new(controller),
        })),
        Err(err) => {
            warn!(%err, "pacer rejected");
            std::ptr::null_mut()
        }
    }
}

/// Apply one spend-rate observation. Returns NaN for a null handle.
#[no_mangle]
pub extern "C" fn uplift_pacer_update(handle: *const PacerHandle, observed_spend_rate: f64) -> f64 {
    match unsafe { handle.as_ref() } {
        Some(handle) => handle.pacer.update(observed_spend_rate).adjustment_factor,
        None => f64::NAN,
    }
}

/// Current multiplier. Returns NaN for a null handle.
#[no_mangle]
pub extern "C" fn uplift_pacer_factor(handle: *const PacerHandle) -> f64 {
    match unsafe { handle.as_ref() } {
        Some(handle) => handle.pacer.snapshot().adjustment_factor,
        None => f64::NAN,
    }
}

/// Restore the initial state for a new budget period.
#[no_mangle]
pub extern "C" fn uplift_pacer_reset(handle: *const PacerHandle) {
    if let Some(handle) = unsafe { handle.as_ref() } {
        handle.pacer.reset();
    }
}

/// Release a handle created by either pacer constructor.
#[no_mangle]
pub extern "C" fn uplift_pacer_free(handle: *mut PacerHandle) {
    if handle.is_null() {
        return;
    }
    unsafe {
        drop(Box::from_raw(handle));
    }
}

/// `max(0, uplift * conversion_value * multiplier)`.
#[no_mangle]
pub extern "C" fn uplift_bid(uplift: f64, conversion_value: f64, multiplier: f64) -> f64 {
    bidding_service::bid(UpliftScore::new(uplift), conversion_value, multiplier).amount()
}

/// Evaluate `len` rows given as parallel arrays of scores and 0/1 labels.
///
/// Writes the AUUC to `out_auuc` and, when `out_curve` is non-null, the Qini
/// curve (in rank order, `len` values). Returns an `ErrorCode`.
#[no_mangle]
pub extern "C" fn uplift_evaluate(
    scores: *const f64,
    treatment: *const u8,
    conversion: *const u8,
    len: usize,
    out_curve: *mut f64,
    out_auuc: *mut f64,
) -> u32 {
    if scores.is_null() || treatment.is_null() || conversion.is_null() || out_auuc.is_null() {
        return ErrorCode::InvalidInput as u32;
    }
    let (scores, treatment, conversion) = unsafe {
        (
            slice::from_raw_parts(scores, len),
            slice::from_raw_parts(treatment, len),
            slice::from_raw_parts(conversion, len),
        )
    };

    let rows = scores
        .iter()
        .zip(treatment)
        .zip(conversion)
        .map(|((s, t), c)| EvaluationRow::from_labels(*s, *t, *c))
        .collect::<Result<Vec<_>, UpliftError>>();

    let result = rows.and_then(|rows| evaluation_service::evaluate(&EvaluationSet::new(rows)));
    match result {
        Ok((curve, auuc)) => {
            unsafe {
                *out_auuc = auuc;
                if !out_curve.is_null() {
                    slice::from_raw_parts_mut(out_curve, len).copy_from_slice(curve.values());
                }
            }
            ErrorCode::Ok as u32
        }
        Err(err) => {
            warn!(%err, "evaluation through ffi failed");
            err.code() as u32
        }
    }
}
