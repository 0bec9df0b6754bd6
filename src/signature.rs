//! Fixed string indicators matched against live host data.

use serde::{Deserialize, Serialize};

/// Registry paths left behind by guest tools.
pub const VM_TOOLS_KEYS: [&str; 2] = [
    "SOFTWARE\\VMware, Inc.\\VMware Tools",
    "SOFTWARE\\Oracle\\VirtualBox Guest Additions",
];

/// Hypervisor vendor strings found in BIOS descriptors.
pub const BIOS_PATTERNS: [&str; 4] = ["VMware", "VirtualBox", "Xen", "Hyper-V"];

/// Executables of guest tools and analysis software.
pub const PROCESS_BLACKLIST: [&str; 8] = [
    "vboxservice.exe",
    "vboxtray.exe",
    "vmtoolsd.exe",
    "vmwaretray.exe",
    "wireshark.exe",
    "procmon.exe",
    "ollydbg.exe",
    "x32dbg.exe",
];

/// Where the BIOS descriptor lives.
pub const BIOS_KEY: &str = "HARDWARE\\DESCRIPTION\\System";
pub const BIOS_VALUE: &str = "SystemBiosVersion";

/// An ordered list of patterns. Order only matters for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignatureList(Vec<String>);

impl SignatureList {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SignatureList(patterns.into_iter().map(Into::into).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First pattern equal to `candidate`, ignoring ASCII case.
    pub fn matches_exact_ignore_case(&self, candidate: &str) -> Option<&str> {
        self.iter().find(|p| p.eq_ignore_ascii_case(candidate))
    }

    /// First pattern contained in `haystack`, case-sensitive.
    pub fn find_substring(&self, haystack: &str) -> Option<&str> {
        self.iter().find(|p| !p.is_empty() && haystack.contains(p))
    }
}

/// Every signature the probes consult.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Signatures {
    pub config_keys: SignatureList,
    pub bios_patterns: SignatureList,
    pub processes: SignatureList,
}

impl Default for Signatures {
    fn default() -> Self {
        Signatures {
            config_keys: SignatureList::new(VM_TOOLS_KEYS),
            bios_patterns: SignatureList::new(BIOS_PATTERNS),
            processes: SignatureList::new(PROCESS_BLACKLIST),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match_ignores_case() {
        let list = SignatureList::new(PROCESS_BLACKLIST);
        assert_eq!(list.matches_exact_ignore_case("VMTOOLSD.EXE"), Some("vmtoolsd.exe"));
        assert_eq!(list.matches_exact_ignore_case("vmtoolsd"), None);
        assert_eq!(list.matches_exact_ignore_case("my-vmtoolsd.exe"), None);
    }

    #[test]
    fn test_substring_is_case_sensitive() {
        let list = SignatureList::new(BIOS_PATTERNS);
        assert_eq!(list.find_substring("VBOX - 1 VirtualBox"), Some("VirtualBox"));
        assert_eq!(list.find_substring("virtualbox"), None);
        assert_eq!(list.find_substring("American Megatrends Inc. 2.1"), None);
    }

    #[test]
    fn test_empty_pattern_never_matches() {
        let list = SignatureList::new(vec![""]);
        assert_eq!(list.find_substring("anything"), None);
    }

    #[test]
    fn test_defaults() {
        let sigs = Signatures::default();
        assert_eq!(sigs.config_keys.len(), 2);
        assert_eq!(sigs.bios_patterns.len(), 4);
        assert_eq!(sigs.processes.len(), 8);
    }

    #[test]
    fn test_deserialize_plain_array() {
        let sigs: Signatures =
            serde_json::from_str(r#"{"processes": ["x64dbg.exe"]}"#).unwrap();
        assert_eq!(sigs.processes, SignatureList::new(vec!["x64dbg.exe"]));
        assert_eq!(sigs.bios_patterns.len(), 4);
    }
}
