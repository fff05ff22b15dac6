#![no_main]

use libfuzzer_sys::fuzz_target;
use vigia::baseline::snapshot_from_value;
use vigia::regression::RegressionConfig;
use vigia::report::{ReportKind, Reporter};
use vigia::runner::RegressionRunner;

fuzz_target!(|data: &[u8]| {
    // Split the input into a baseline and a current document at the first NUL
    let split = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    let (left, right) = data.split_at(split);
    let right = right.get(1..).unwrap_or_default();

    let (Ok(baseline), Ok(current)) = (
        serde_json::from_slice::<serde_json::Value>(left),
        serde_json::from_slice::<serde_json::Value>(right),
    ) else {
        return;
    };
    let (Some(baseline), Some(current)) = (snapshot_from_value(baseline), snapshot_from_value(current)) else {
        return;
    };

    // No snapshot shape may make a detector or the reporter panic
    let Ok(runner) = RegressionRunner::new(RegressionConfig::quiet()) else {
        return;
    };
    let records = runner.detect(&baseline, &current);
    let _ = Reporter::new().generate(ReportKind::Detailed, &records).to_report_string();
});
