//! Output normalization for captured configurations.
//!
//! [`clean`] turns raw shell output into the text that gets stored and
//! compared: terminal escapes and NULs are removed, vendor noise lines are
//! dropped, and blank lines are either dropped or replaced by the vendor's
//! placeholder. The transform is pure and idempotent.

use crate::platform::{Vendor, VendorProfile};

/// Normalize raw captured output for `vendor`.
pub fn clean(raw: &str, vendor: Vendor) -> String {
    let profile = VendorProfile::get(vendor);

    let stripped = strip_ansi_escapes::strip(raw.as_bytes());
    let text = String::from_utf8_lossy(&stripped).replace('\0', "");

    let mut lines = Vec::new();
    for line in text.lines() {
        let line = line.trim_end_matches(['\r', '\n']);
        let trimmed = line.trim();

        if trimmed.is_empty() {
            if let Some(placeholder) = profile.blank_line_placeholder {
                lines.push(placeholder);
            }
            continue;
        }

        if profile.is_noise(trimmed) {
            continue;
        }

        lines.push(line);
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const CISCO_RAW: &str = "Building configuration...\n\
        ! Last configuration change at 10:00\n\
        interface Gi0/1\n shutdown\n";

    #[test]
    fn test_cisco_banner_and_timestamp_removed() {
        let vendor = Vendor::detect("Cisco Systems");
        assert_eq!(clean(CISCO_RAW, vendor), "interface Gi0/1\n shutdown");
    }

    #[test]
    fn test_cisco_blank_lines_become_placeholders() {
        let raw = "Current configuration : 1024 bytes\r\n\
            hostname r1\r\n\r\n\
            !Time: Mon Jan  1 00:00:00 2024\r\n\
            interface Gi0/1\r\n";
        assert_eq!(clean(raw, Vendor::Cisco), "hostname r1\n!\ninterface Gi0/1");
    }

    #[test]
    fn test_ansi_and_nul_removed() {
        let raw = "\x1b[1mhostname r1\x1b[0m\0\n";
        assert_eq!(clean(raw, Vendor::Mellanox), "hostname r1");
    }

    #[test]
    fn test_huawei_echo_and_prompt_dropped() {
        let raw = "<HW-CORE>screen-length 0 temporary\n\
            display current-configuration\n\
            #\n\
            sysname HW-CORE\n\
            \n\
            interface GE1/0/1\n\
            <HW-CORE>";
        assert_eq!(
            clean(raw, Vendor::Huawei),
            "#\nsysname HW-CORE\ninterface GE1/0/1"
        );
    }

    #[test]
    fn test_mellanox_header_dropped() {
        let raw = "show running-config\n\
            ##\n\
            ## Generated at 2024/01/01 00:00:00 +0000\n\
            ##\n\
            \n\
            interface ethernet 1/1 mtu 9216\n";
        assert_eq!(
            clean(raw, Vendor::Depo),
            "##\n##\ninterface ethernet 1/1 mtu 9216"
        );
    }

    #[test]
    fn test_clean_is_idempotent() {
        let samples = [
            (CISCO_RAW, Vendor::Cisco),
            ("a\n\n\nb\n\n", Vendor::Cisco),
            ("\n", Vendor::Cisco),
            ("", Vendor::Huawei),
            ("<R1>display cur\n\x1b[32m sysname R1\x1b[0m\r\n\r\n", Vendor::Huawei),
            ("## Generated\n  \t \nvlan 10\n", Vendor::Mellanox),
        ];

        for (raw, vendor) in samples {
            let once = clean(raw, vendor);
            assert_eq!(clean(&once, vendor), once, "not idempotent for {raw:?}");
        }
    }
}
