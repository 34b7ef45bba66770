//! # Metrics Module
//!
//! Per-example similarity metrics between a predicted and a ground-truth
//! frame, and their reduction over a set of examples.
//!
//! All metrics are evaluated against the binarized ground-truth foreground
//! mask. Images are clamped to `[0, 1]` before any PSNR is computed.

use crate::frame::check_dimensions;
use crate::{Result, RgbdaFrame};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Foreground probabilities above this value count as foreground.
pub const FG_MASK_THRESHOLD: f32 = 0.5;

/// MSE floor, caps PSNR at 100 dB for identical images.
pub const MIN_MSE: f64 = 1e-10;

/// Metric names in reporting order.
pub const EVAL_METRIC_NAMES: [&str; 5] = [
    "psnr_masked",
    "psnr_fg",
    "psnr_full_image",
    "depth_abs_fg",
    "iou",
];

/// One of the reported metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvalMetric {
    /// PSNR averaged over ground-truth foreground pixels only.
    PsnrMasked,
    /// PSNR of both images composited on black with the ground-truth mask.
    PsnrFg,
    PsnrFullImage,
    /// Mean absolute depth error over foreground pixels with valid depth.
    DepthAbsFg,
    /// Intersection over union of the binarized foreground masks.
    Iou,
}

impl EvalMetric {
    pub const ALL: [EvalMetric; 5] = [
        EvalMetric::PsnrMasked,
        EvalMetric::PsnrFg,
        EvalMetric::PsnrFullImage,
        EvalMetric::DepthAbsFg,
        EvalMetric::Iou,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            EvalMetric::PsnrMasked => EVAL_METRIC_NAMES[0],
            EvalMetric::PsnrFg => EVAL_METRIC_NAMES[1],
            EvalMetric::PsnrFullImage => EVAL_METRIC_NAMES[2],
            EvalMetric::DepthAbsFg => EVAL_METRIC_NAMES[3],
            EvalMetric::Iou => EVAL_METRIC_NAMES[4],
        }
    }

    /// Value reported when the metric is undefined for an example.
    ///
    /// Chosen as the worst plausible score so that an undefined metric never
    /// improves an average.
    #[must_use]
    pub fn missing_value(self) -> f64 {
        match self {
            EvalMetric::PsnrMasked | EvalMetric::PsnrFg | EvalMetric::PsnrFullImage => 0.0,
            EvalMetric::DepthAbsFg => 100_000.0,
            EvalMetric::Iou => 0.0,
        }
    }

    /// Whether a larger value means a better prediction.
    #[must_use]
    pub fn higher_is_better(self) -> bool {
        !matches!(self, EvalMetric::DepthAbsFg)
    }
}

impl fmt::Display for EvalMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Scores of one example (or their average).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvalMetrics {
    pub psnr_masked: f64,
    pub psnr_fg: f64,
    pub psnr_full_image: f64,
    pub depth_abs_fg: f64,
    pub iou: f64,
}

impl EvalMetrics {
    /// Build by evaluating `value` for every metric.
    pub fn from_fn(mut value: impl FnMut(EvalMetric) -> f64) -> Self {
        Self {
            psnr_masked: value(EvalMetric::PsnrMasked),
            psnr_fg: value(EvalMetric::PsnrFg),
            psnr_full_image: value(EvalMetric::PsnrFullImage),
            depth_abs_fg: value(EvalMetric::DepthAbsFg),
            iou: value(EvalMetric::Iou),
        }
    }

    #[must_use]
    pub fn get(&self, metric: EvalMetric) -> f64 {
        match metric {
            EvalMetric::PsnrMasked => self.psnr_masked,
            EvalMetric::PsnrFg => self.psnr_fg,
            EvalMetric::PsnrFullImage => self.psnr_full_image,
            EvalMetric::DepthAbsFg => self.depth_abs_fg,
            EvalMetric::Iou => self.iou,
        }
    }

    /// `(metric, value)` pairs in reporting order.
    pub fn iter(&self) -> impl Iterator<Item = (EvalMetric, f64)> + '_ {
        EvalMetric::ALL.into_iter().map(|metric| (metric, self.get(metric)))
    }
}

/// Arithmetic mean of every metric. `None` when `per_example` is empty.
#[must_use]
pub fn average_metrics(per_example: &[EvalMetrics]) -> Option<EvalMetrics> {
    if per_example.is_empty() {
        return None;
    }
    let count = per_example.len() as f64;
    Some(EvalMetrics::from_fn(|metric| {
        per_example.iter().map(|m| m.get(metric)).sum::<f64>() / count
    }))
}

/// Score `pred` against `gt`.
///
/// Fails when the two frames differ in resolution.
pub fn eval_one(pred: &RgbdaFrame, gt: &RgbdaFrame) -> Result<EvalMetrics> {
    check_dimensions("prediction", gt.dimensions(), pred.dimensions())?;

    let (width, height) = gt.dimensions();
    let pixel_count = u64::from(width) * u64::from(height);

    let mut sse_full = 0.0_f64;
    let mut sse_fg = 0.0_f64;
    let mut fg_count = 0_u64;
    let mut depth_abs_sum = 0.0_f64;
    let mut depth_count = 0_u64;
    let mut intersection = 0_u64;
    let mut union = 0_u64;

    for (x, y, gt_rgb) in gt.image().enumerate_pixels() {
        let pred_rgb = pred.image().get_pixel(x, y);
        let gt_fg = gt.mask().get_pixel(x, y).0[0] > FG_MASK_THRESHOLD;
        let pred_fg = pred.mask().get_pixel(x, y).0[0] > FG_MASK_THRESHOLD;

        let sse: f64 = pred_rgb
            .0
            .iter()
            .zip(gt_rgb.0.iter())
            .map(|(p, g)| {
                let diff = f64::from(p.clamp(0.0, 1.0)) - f64::from(g.clamp(0.0, 1.0));
                diff * diff
            })
            .sum();
        sse_full += sse;

        if gt_fg {
            sse_fg += sse;
            fg_count += 1;

            let gt_depth = valid_gt_depth(gt, x, y);
            if gt_depth > 0.0 {
                let pred_depth = f64::from(pred.depth().get_pixel(x, y).0[0]);
                depth_abs_sum += (pred_depth - f64::from(gt_depth)).abs();
                depth_count += 1;
            }
        }

        if gt_fg && pred_fg {
            intersection += 1;
        }
        if gt_fg || pred_fg {
            union += 1;
        }
    }

    let channel_count = 3.0;
    let psnr_masked = (fg_count > 0).then(|| psnr(sse_fg / (channel_count * fg_count as f64)));
    let psnr_fg = (pixel_count > 0).then(|| psnr(sse_fg / (channel_count * pixel_count as f64)));
    let psnr_full_image =
        (pixel_count > 0).then(|| psnr(sse_full / (channel_count * pixel_count as f64)));
    let depth_abs_fg = (depth_count > 0).then(|| depth_abs_sum / depth_count as f64);
    let iou = Some(if union == 0 {
        1.0
    } else {
        intersection as f64 / union as f64
    });

    Ok(EvalMetrics::from_fn(|metric| {
        let value = match metric {
            EvalMetric::PsnrMasked => psnr_masked,
            EvalMetric::PsnrFg => psnr_fg,
            EvalMetric::PsnrFullImage => psnr_full_image,
            EvalMetric::DepthAbsFg => depth_abs_fg,
            EvalMetric::Iou => iou,
        };
        match value {
            Some(v) if v.is_finite() => v,
            _ => {
                tracing::warn!(%metric, "metric undefined, using missing value");
                metric.missing_value()
            }
        }
    }))
}

/// Ground-truth depth with non-finite entries zeroed and the depth mask applied.
fn valid_gt_depth(gt: &RgbdaFrame, x: u32, y: u32) -> f32 {
    let depth = gt.depth().get_pixel(x, y).0[0];
    let depth = if depth.is_finite() { depth } else { 0.0 };
    match gt.depth_mask() {
        Some(mask) => depth * mask.get_pixel(x, y).0[0],
        None => depth,
    }
}

fn psnr(mse: f64) -> f64 {
    -10.0 * mse.max(MIN_MSE).log10()
}

// =============================================================================
// TESTS
// =============================================================================
