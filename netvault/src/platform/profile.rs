//! The vendor profile table.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::bytes::Regex;

use super::vendor::Vendor;
use crate::channel::compile_prompt_pattern;

/// Default completion marker: a line ending in `>` or `#`.
const DEFAULT_PROMPT: &str = r"[>#]\s*$";

/// Huawei completes on its bracketed `<hostname>` prompt only, alone on its
/// line; a bare `#` is a section separator in its configuration output.
const HUAWEI_PROMPT: &str = r"^\s*<[^<>\s]+>\s*$";

/// Command table and output rules for one vendor family.
#[derive(Debug, Clone)]
pub struct VendorProfile {
    /// Vendor family this profile belongs to.
    pub vendor: Vendor,

    /// Pager-disable and privilege commands sent before the dump, in order.
    pub setup_commands: &'static [&'static str],

    /// The command that prints the running configuration.
    pub dump_command: &'static str,

    /// Prompt pattern that marks command completion.
    pub prompt_pattern: &'static str,

    /// Compiled form of `prompt_pattern`.
    pub prompt: Regex,

    /// Lines starting with any of these (after trimming) are dropped.
    pub noise_prefixes: &'static [&'static str],

    /// Blank lines become this line instead of being dropped.
    pub blank_line_placeholder: Option<&'static str>,
}

static PROFILES: Lazy<IndexMap<Vendor, VendorProfile>> = Lazy::new(|| {
    let mut profiles = IndexMap::new();

    profiles.insert(
        Vendor::Huawei,
        VendorProfile::new(
            Vendor::Huawei,
            &["screen-length 0 temporary"],
            "display current-configuration",
            HUAWEI_PROMPT,
            &["display", "screen-length", "<"],
            None,
        ),
    );

    for vendor in [Vendor::Mellanox, Vendor::Depo] {
        profiles.insert(
            vendor,
            VendorProfile::new(
                vendor,
                &["enable", "terminal length 999"],
                "show running-config",
                DEFAULT_PROMPT,
                &["## Generated", "show running-config"],
                None,
            ),
        );
    }

    profiles.insert(
        Vendor::Cisco,
        VendorProfile::new(
            Vendor::Cisco,
            &["terminal length 0"],
            "show running-config",
            DEFAULT_PROMPT,
            &[
                "! Last configuration change",
                "!Time:",
                "show",
                "terminal",
                "Building configuration",
                "Current configuration",
            ],
            Some("!"),
        ),
    );

    profiles
});

impl VendorProfile {
    fn new(
        vendor: Vendor,
        setup_commands: &'static [&'static str],
        dump_command: &'static str,
        prompt_pattern: &'static str,
        noise_prefixes: &'static [&'static str],
        blank_line_placeholder: Option<&'static str>,
    ) -> Self {
        Self {
            vendor,
            setup_commands,
            dump_command,
            prompt_pattern,
            prompt: compile_prompt_pattern(prompt_pattern).expect("built-in prompt pattern"),
            noise_prefixes,
            blank_line_placeholder,
        }
    }

    /// Profile for a vendor family.
    pub fn get(vendor: Vendor) -> &'static VendorProfile {
        match PROFILES.get(&vendor) {
            Some(profile) => profile,
            None => &PROFILES[&Vendor::Cisco],
        }
    }

    /// Profile for a device's manufacturer string.
    pub fn for_manufacturer(manufacturer: &str) -> &'static VendorProfile {
        Self::get(Vendor::detect(manufacturer))
    }

    /// Whether a trimmed output line is vendor noise.
    pub fn is_noise(&self, trimmed_line: &str) -> bool {
        self.noise_prefixes
            .iter()
            .any(|prefix| trimmed_line.starts_with(prefix))
    }
}
