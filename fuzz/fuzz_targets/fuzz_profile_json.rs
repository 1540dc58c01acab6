#![no_main]

use libfuzzer_sys::fuzz_target;
use slider_core::{MotionProfile, sample_profile};

// Arbitrary bytes through the profile boundary: parsing and validation must
// never panic, and any profile that survives validation must be safely
// samplable.
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(profile) = MotionProfile::from_json(text) {
        // Bound the walk: huge keyframe times mean multi-million-sample plans.
        if profile.total_seconds() <= 10_000.0 {
            let plan = sample_profile(&profile, 0.02);
            assert_eq!(plan.times.len(), plan.positions_mm.len());
            assert!(!plan.is_empty());
        }
    }
});
