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

//! Peripheral bus probes: USB, I2C, camera enumeration.

use futures::future::BoxFuture;

use super::{capture, DiagnosticResult};
use crate::executor::CommandExecutor;

pub(super) fn usb(executor: &CommandExecutor) -> BoxFuture<'_, DiagnosticResult> {
    Box::pin(async move {
        match capture(executor, "lsusb").await {
            Ok(output) => DiagnosticResult::pass("usb", format!("USB Devices:\n{output}")),
            Err(detail) => {
                DiagnosticResult::fail("usb", format!("Error checking USB devices: {detail}"))
            }
        }
    })
}

pub(super) fn i2c(executor: &CommandExecutor) -> BoxFuture<'_, DiagnosticResult> {
    Box::pin(async move {
        match capture(executor, "i2cdetect -y 1").await {
            Ok(output) => DiagnosticResult::pass("i2c", format!("I2C Devices:\n{output}")),
            Err(detail) => {
                DiagnosticResult::fail("i2c", format!("Error scanning I2C bus: {detail}"))
            }
        }
    })
}

/// Enumerate video capture devices.
///
/// Enumeration only; this console does not touch the video stream itself.
pub(super) fn camera(executor: &CommandExecutor) -> BoxFuture<'_, DiagnosticResult> {
    Box::pin(async move {
        let raw = match capture(executor, "v4l2-ctl --list-devices").await {
            Ok(raw) => raw,
            Err(detail) => {
                return DiagnosticResult::fail(
                    "camera",
                    format!("Error enumerating cameras: {detail}"),
                )
            }
        };

        // CSI sensors show up as vi-output nodes on the capture engine.
        let csi_ports: Vec<&str> = raw
            .lines()
            .filter(|line| line.to_lowercase().contains("vi-output"))
            .map(str::trim)
            .collect();

        if csi_ports.is_empty() {
            if raw.contains("video") {
                DiagnosticResult::warn(
                    "camera",
                    format!("No CSI cameras detected; other video devices present:\n{raw}"),
                )
            } else {
                DiagnosticResult::warn("camera", "No cameras detected.")
            }
        } else {
            DiagnosticResult::pass(
                "camera",
                format!("Detected CSI camera(s):\n{}", csi_ports.join("\n")),
            )
        }
    })
}
