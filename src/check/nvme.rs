use log::warn;

use crate::error::{alloc_zeroed, Result};
use crate::models::smart::NvmeHealth;
use crate::models::trip::{CheckResult, CheckStatus, ProtocolFamily, TripDetail, TripInfo};
use crate::smart::parse::{NVME_ALL_NAMESPACES, NVME_HEALTH_LOG};
use crate::transport::NvmeTransport;

fn warning_bit(bit: u8) -> String {
    let text = match bit {
        0 => "Available spare capacity has fallen below the threshold",
        1 => "Temperature is above an over temperature threshold or below an under temperature threshold",
        2 => "NVM subsystem reliability has been degraded due to significant media related errors or internal errors",
        3 => "Media has been placed in read only mode",
        4 => "Volatile memory backup device has failed",
        5 => "Persistent memory region has become read-only or unreliable",
        _ => return format!("Reserved critical warning bit {} is set", bit),
    };
    text.to_string()
}

/// One reason per set bit, lowest bit first.
pub fn critical_warning_reasons(bits: u8) -> Vec<String> {
    (0..8u8).filter(|&b| bits & (1u8 << b) != 0).map(warning_bit).collect()
}

pub fn check_nvme(dev: &dyn NvmeTransport) -> Result<CheckResult> {
    let mut page = alloc_zeroed(NvmeHealth::PAGE_LEN)?;
    if let Err(e) = dev.get_log_page(NVME_HEALTH_LOG, NVME_ALL_NAMESPACES, &mut page) {
        warn!("NVMe SMART / health log unavailable: {}", e);
        return Ok(CheckResult::new(CheckStatus::Unknown));
    }
    let critical_warning = page[0];
    if critical_warning == 0 {
        return Ok(CheckResult::new(CheckStatus::Pass));
    }
    Ok(CheckResult::with_trip(
        CheckStatus::Fail,
        TripInfo {
            protocol: ProtocolFamily::Nvme,
            detail:   TripDetail::Nvme { critical_warning },
            reason:   critical_warning_reasons(critical_warning).join("; "),
        },
    ))
}
