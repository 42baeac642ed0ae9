// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Thermal zone and power rail probes.

use futures::future::BoxFuture;

use super::{capture, DiagnosticResult};
use crate::executor::CommandExecutor;

/// Zones reporting above this are flagged for the operator.
const HOT_ZONE_CELSIUS: f64 = 75.0;

/// Candidate readback paths per rail. Boards route the monitors
/// differently across carrier revisions, so each is tried in order.
const RAIL_SOURCES: &[(&str, &[&str])] = &[
    (
        "3.3V",
        &[
            "cat /sys/class/hwmon/hwmon*/in0_input 2>/dev/null | head -1",
            "cat /sys/bus/iio/devices/iio:device*/in_voltage0_raw 2>/dev/null | head -1",
        ],
    ),
    (
        "5.0V",
        &[
            "cat /sys/class/hwmon/hwmon*/in1_input 2>/dev/null | head -1",
            "cat /sys/bus/iio/devices/iio:device*/in_voltage1_raw 2>/dev/null | head -1",
        ],
    ),
];

pub(super) fn thermals(executor: &CommandExecutor) -> BoxFuture<'_, DiagnosticResult> {
    Box::pin(async move {
        let command = r#"for zone in /sys/class/thermal/thermal_zone*; do echo "$(cat $zone/type 2>/dev/null):$(cat $zone/temp 2>/dev/null)"; done"#;
        let raw = match capture(executor, command).await {
            Ok(raw) => raw,
            Err(detail) => {
                return DiagnosticResult::fail(
                    "thermals",
                    format!("Error retrieving thermal zones: {detail}"),
                )
            }
        };

        let mut lines = vec!["Thermal Sensors:".to_string()];
        let mut hot = false;
        for entry in raw.lines() {
            let Some((label, millis)) = entry.rsplit_once(':') else {
                continue;
            };
            match millis.trim().parse::<f64>() {
                Ok(millis) => {
                    let celsius = millis / 1000.0;
                    if celsius > HOT_ZONE_CELSIUS {
                        hot = true;
                        lines.push(format!("{label}: {celsius:.1}°C (hot)"));
                    } else {
                        lines.push(format!("{label}: {celsius:.1}°C"));
                    }
                }
                Err(_) => lines.push(format!("{label}: invalid temperature format")),
            }
        }

        let output = lines.join("\n");
        if hot {
            DiagnosticResult::warn("thermals", output)
        } else {
            DiagnosticResult::pass("thermals", output)
        }
    })
}

pub(super) fn rails(executor: &CommandExecutor) -> BoxFuture<'_, DiagnosticResult> {
    Box::pin(async move {
        let mut lines = vec!["Power Rails:".to_string()];
        let mut missing = false;

        for (rail, sources) in RAIL_SOURCES {
            let mut voltage = None;
            for source in *sources {
                if let Ok(raw) = capture(executor, source).await {
                    if let Ok(value) = raw.trim().parse::<f64>() {
                        // Monitors report millivolts; small values are
                        // already volts.
                        voltage = Some(if value > 100.0 { value / 1000.0 } else { value });
                        break;
                    }
                }
            }
            match voltage {
                Some(volts) => lines.push(format!("{rail}: {volts:.2} V")),
                None => {
                    missing = true;
                    lines.push(format!("{rail}: no readable monitor"));
                }
            }
        }

        let output = lines.join("\n");
        if missing {
            DiagnosticResult::warn("power", output)
        } else {
            DiagnosticResult::pass("power", output)
        }
    })
}
