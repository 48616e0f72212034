// =============================================================================
// Symbol Universe — the fixed, ordered list of equities the service covers
// =============================================================================

use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// One listed equity and its display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniverseEntry {
    pub symbol: String,
    pub name: String,
}

impl UniverseEntry {
    pub fn new(symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.into(),
        }
    }
}

/// Ordered `symbol -> display name` mapping. Serialises as a JSON object whose
/// keys keep the configured order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Universe {
    entries: Vec<UniverseEntry>,
}

impl Universe {
    pub fn new(entries: Vec<UniverseEntry>) -> Self {
        Self { entries }
    }

    /// Display name of `symbol`, if it belongs to the universe.
    pub fn name_of(&self, symbol: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.symbol == symbol)
            .map(|e| e.name.as_str())
    }

    pub fn entries(&self) -> &[UniverseEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for Universe {
    fn default() -> Self {
        Self::new(default_entries())
    }
}

/// The ten Tadawul listings covered out of the box.
pub fn default_entries() -> Vec<UniverseEntry> {
    vec![
        UniverseEntry::new("2222.SR", "Saudi Aramco - أرامكو السعودية"),
        UniverseEntry::new("1180.SR", "Al Rajhi Bank - مصرف الراجحي"),
        UniverseEntry::new("2350.SR", "Saudi Telecom Co - الاتصالات السعودية"),
        UniverseEntry::new("1010.SR", "SABIC - سابك"),
        UniverseEntry::new("1150.SR", "Alinma Bank - مصرف الإنماء"),
        UniverseEntry::new("2310.SR", "Zain KSA - زين السعودية"),
        UniverseEntry::new("2380.SR", "Mobily - موبايلي"),
        UniverseEntry::new("1050.SR", "Saudi National Bank - البنك الأهلي السعودي"),
        UniverseEntry::new("2001.SR", "ACWA Power - أكوا باور"),
        UniverseEntry::new("2330.SR", "Advanced - المتقدمة"),
    ]
}

impl Serialize for Universe {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|e| (&e.symbol, &e.name)))
    }
}
