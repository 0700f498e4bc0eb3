//! Fixtures shared by the unit test modules.

use crate::types::{CodeDescriptors, CodeRecord, TimeComponents};

pub(crate) fn record(hcpcs: &str, tt: f64, ist: f64, work: f64) -> CodeRecord {
    record_in("090", hcpcs, tt, ist, work)
}

pub(crate) fn record_in(global_value: &str, hcpcs: &str, tt: f64, ist: f64, work: f64) -> CodeRecord {
    CodeRecord {
        hcpcs: hcpcs.to_string(),
        description: format!("Procedure {}", hcpcs),
        global_value: global_value.to_string(),
        current_work: work,
        current_tt: tt,
        current_ist: ist,
        current_preservice: 0.0,
        current_postservice: 0.0,
        components: TimeComponents::default(),
        descriptors: CodeDescriptors::default(),
    }
}
