//! Compact report decision rules (spec §4.5).

use crate::wasted_space::VolumeWaste;

pub struct CompactInputs {
    pub volsize: i64,
    pub waste_threshold_percent: f64,
    pub small_file_size: i64,
    pub max_small_file_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactReport {
    pub clean_delete: Vec<VolumeWaste>,
    pub waste: Vec<VolumeWaste>,
    pub small: Vec<VolumeWaste>,
    pub should_reclaim: bool,
    pub should_compact: bool,
}

impl CompactReport {
    /// `CompactableVolumes` = `waste ∪ small`, distinct, preserving the
    /// oldest-first order of `waste` (spec §4.5).
    pub fn compactable_volumes(&self) -> Vec<VolumeWaste> {
        let mut out = self.waste.clone();
        let seen: std::collections::HashSet<i64> = out.iter().map(|v| v.volume_id).collect();
        for v in &self.small {
            if !seen.contains(&v.volume_id) {
                out.push(v.clone());
            }
        }
        out
    }
}

pub fn compact_report(report: &[VolumeWaste], inputs: &CompactInputs) -> CompactReport {
    let clean_delete: Vec<VolumeWaste> = report
        .iter()
        .filter(|v| v.data_size <= v.wasted_size)
        .cloned()
        .collect();
    let clean_ids: std::collections::HashSet<i64> = clean_delete.iter().map(|v| v.volume_id).collect();

    let waste: Vec<VolumeWaste> = report
        .iter()
        .filter(|v| !clean_ids.contains(&v.volume_id))
        .filter(|v| {
            let data_ratio = ratio(v.wasted_size, v.data_size);
            let vol_ratio = ratio(v.wasted_size, inputs.volsize);
            data_ratio >= inputs.waste_threshold_percent || vol_ratio >= inputs.waste_threshold_percent
        })
        .cloned()
        .collect();

    let small: Vec<VolumeWaste> = report
        .iter()
        .filter(|v| !clean_ids.contains(&v.volume_id))
        .filter(|v| v.compressed_size <= inputs.small_file_size)
        .cloned()
        .collect();

    let should_reclaim = !clean_delete.is_empty();

    let waste_percentage = if report.is_empty() {
        0.0
    } else {
        100.0 * waste.len() as f64 / report.len() as f64
    };
    let small_total: i64 = small.iter().map(|v| v.compressed_size).sum();

    let should_compact = (waste_percentage >= inputs.waste_threshold_percent && waste.len() >= 2)
        || small_total > inputs.volsize
        || small.len() > inputs.max_small_file_count;

    CompactReport {
        clean_delete,
        waste,
        small,
        should_reclaim,
        should_compact,
    }
}

fn ratio(numerator: i64, denominator: i64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        100.0 * numerator as f64 / denominator as f64
    }
}
