// Copyright 2018-2021 System76 <info@system76.com>
//
// SPDX-License-Identifier: GPL-3.0-only

//! Per-model facts that firmware discovery cannot provide.

use crate::{
    capability::{Attribute, Capabilities},
    config::Config,
};
use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct QuirkRecord {
    /// Selects the embedded-controller register holding the wireless state on
    /// legacy machines: 1, 2 or 3 for the model-specific layouts, 0 for the
    /// common one.
    pub wireless:    u8,
    pub mailled:     u8,
    /// Negative when the legacy brightness control must not be used.
    pub brightness:  i8,
    pub bluetooth:   u8,
    pub turbo:       bool,
    pub cpu_fans:    u8,
    pub gpu_fans:    u8,
    pub predator_v4: bool,
}

impl QuirkRecord {
    pub const UNKNOWN: QuirkRecord = QuirkRecord {
        wireless:    0,
        mailled:     0,
        brightness:  0,
        bluetooth:   0,
        turbo:       false,
        cpu_fans:    0,
        gpu_fans:    0,
        predator_v4: false,
    };

    pub const ASPIRE_1520: QuirkRecord = QuirkRecord { brightness: -1, ..Self::UNKNOWN };

    pub const TRAVELMATE_2490: QuirkRecord = QuirkRecord { mailled: 1, ..Self::UNKNOWN };

    pub const PREDATOR_TURBO: QuirkRecord =
        QuirkRecord { turbo: true, cpu_fans: 1, gpu_fans: 1, ..Self::UNKNOWN };

    pub const PREDATOR_TURBO_DUAL_GPU_FAN: QuirkRecord =
        QuirkRecord { turbo: true, cpu_fans: 1, gpu_fans: 2, ..Self::UNKNOWN };

    pub const PREDATOR_V4: QuirkRecord = QuirkRecord { predator_v4: true, ..Self::UNKNOWN };

    /// Legacy machine without bluetooth.
    pub const MEDION_MD_98300: QuirkRecord = QuirkRecord { wireless: 1, ..Self::UNKNOWN };

    pub const FUJITSU_AMILO_LI_1718: QuirkRecord = QuirkRecord { wireless: 2, ..Self::UNKNOWN };

    pub const LENOVO_IDEAPAD_S205: QuirkRecord = QuirkRecord { wireless: 3, ..Self::UNKNOWN };

    /// Attributes this record declares statically.
    pub fn capabilities(&self) -> Capabilities {
        let mut caps = Capabilities::empty();

        if self.mailled != 0 {
            caps.insert(Attribute::MailLed);
        }

        if self.brightness != 0 {
            caps.insert(Attribute::Brightness);
        }

        if self.turbo {
            caps.insert(Attribute::TurboOverclock);
            caps.insert(Attribute::TurboLed);
            caps.insert(Attribute::TurboFan);
        }

        if self.predator_v4 {
            caps.insert(Attribute::PlatformProfile);
            caps.insert(Attribute::FanSpeedRead);
        }

        caps
    }
}

/// What a matching identity entry contributes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QuirkMatch {
    Record(&'static QuirkRecord),
    /// Replace the whole capability mask.
    ForceCaps(u32),
}

/// The platform identity lookup service.
pub trait QuirkLookup {
    fn lookup(&self, vendor: &str, model: &str) -> Option<QuirkMatch>;
}

#[derive(Clone, Copy, Debug)]
enum Field {
    Contains(&'static str),
    Exact(&'static str),
}

impl Field {
    fn matches(self, value: &str) -> bool {
        match self {
            Field::Contains(pattern) => value.contains(pattern),
            Field::Exact(pattern) => value == pattern,
        }
    }
}

#[derive(Debug)]
pub struct DmiEntry {
    pub ident: &'static str,
    vendor:    Field,
    product:   Field,
    data:      QuirkMatch,
}

const fn acer(ident: &'static str, product: &'static str, record: &'static QuirkRecord) -> DmiEntry {
    DmiEntry {
        ident,
        vendor: Field::Contains("Acer"),
        product: Field::Contains(product),
        data: QuirkMatch::Record(record),
    }
}

const fn other(
    ident: &'static str,
    vendor: &'static str,
    product: &'static str,
    record: &'static QuirkRecord,
) -> DmiEntry {
    DmiEntry {
        ident,
        vendor: Field::Contains(vendor),
        product: Field::Contains(product),
        data: QuirkMatch::Record(record),
    }
}

const fn dock(ident: &'static str, vendor: Field, product: Field) -> DmiEntry {
    DmiEntry { ident, vendor, product, data: QuirkMatch::ForceCaps(Attribute::KbdDock.bit()) }
}

const TURBO: &QuirkRecord = &QuirkRecord::PREDATOR_TURBO;
const TURBO_2: &QuirkRecord = &QuirkRecord::PREDATOR_TURBO_DUAL_GPU_FAN;
const V4: &QuirkRecord = &QuirkRecord::PREDATOR_V4;
const TM2490: &QuirkRecord = &QuirkRecord::TRAVELMATE_2490;
const A1520: &QuirkRecord = &QuirkRecord::ASPIRE_1520;

/// Acer entries, scanned in order; the first match wins.
pub static ACER_QUIRKS: &[DmiEntry] = &[
    acer("Acer Aspire 1360", "Aspire 1360", A1520),
    acer("Acer Predator PH16-71", "Predator PH16-71", TURBO),
    acer("Acer Predator PHN16-71", "Predator PHN16-71", TURBO),
    acer("Acer Predator PHN18-71", "Predator PHN18-71", TURBO),
    acer("Acer Predator PHN18-72", "Predator PHN18-72", TURBO),
    acer("Acer Aspire 1520", "Aspire 1520", A1520),
    acer("Acer Aspire 3100", "Aspire 3100", TM2490),
    acer("Acer Aspire 3610", "Aspire 3610", TM2490),
    acer("Acer Aspire 5100", "Aspire 5100", TM2490),
    acer("Acer Aspire 5610", "Aspire 5610", TM2490),
    acer("Acer Aspire 5630", "Aspire 5630", TM2490),
    acer("Acer Aspire 5650", "Aspire 5650", TM2490),
    acer("Acer Aspire 5680", "Aspire 5680", TM2490),
    acer("Acer Aspire 9110", "Aspire 9110", TM2490),
    acer("Acer TravelMate 2490", "TravelMate 2490", TM2490),
    acer("Acer TravelMate 4200", "TravelMate 4200", TM2490),
    acer("Acer Predator PH314-51s", "Predator PH314-51s", TURBO),
    acer("Acer Predator PH314-52s", "Predator PH314-52s", TURBO),
    acer("Acer Predator PH315-52", "Predator PH315-52", TURBO),
    acer("Acer Predator PH315-53", "Predator PH315-53", TURBO),
    acer("Acer Predator PH315-54", "Predator PH315-54", TURBO),
    acer("Acer Predator PH315-55", "Predator PH315-55", TURBO),
    acer("Acer Predator PH317-53", "Predator PH317-53", TURBO),
    acer("Acer Predator PH317-54", "Predator PH317-54", TURBO),
    acer("Acer Predator PH317-56", "Predator PH317-56", TURBO),
    acer("Acer Predator PH517-51", "Predator PH517-51", TURBO),
    acer("Acer Predator PH517-52", "Predator PH517-52", TURBO),
    acer("Acer Predator PH517-61", "Predator PH517-61", TURBO),
    acer("Acer Predator PH717-71", "Predator PH717-71", TURBO),
    acer("Acer Predator PH717-72", "Predator PH717-72", TURBO),
    acer("Acer Predator PT315-51", "Predator PT315-51", TURBO),
    acer("Acer Predator PT314-52S", "Predator PT314-52s", TURBO),
    acer("Acer Predator PT315-52", "Predator PT315-52", TURBO),
    acer("Acer Predator PT515-51", "Predator PT515-51", TURBO_2),
    acer("Acer Predator PT316-51", "Predator PT316-51", TURBO),
    acer("Acer Predator PT515-52", "Predator PT515-52", TURBO_2),
    acer("Acer Predator PT516-52s", "Predator PT516-52s", TURBO_2),
    acer("Acer Predator PT917-71", "Predator PT917-71", TURBO),
    acer("Acer Nitro AN515-58", "Nitro AN515-58", TURBO),
    acer("Acer Predator PHN16-71", "Predator PHN16-71", V4),
    acer("Acer Predator PH16-71", "Predator PH16-71", V4),
    acer("Acer Predator PH18-71", "Predator PH18-71", V4),
    dock("Acer Aspire Switch 10E SW3-016", Field::Contains("Acer"), Field::Contains("Aspire SW3-016")),
    dock("Acer Aspire Switch 10 SW5-012", Field::Contains("Acer"), Field::Contains("Aspire SW5-012")),
    dock("Acer Aspire Switch V 10 SW5-017", Field::Exact("Acer"), Field::Exact("SW5-017")),
    dock("Acer One 10 (S1003)", Field::Exact("Acer"), Field::Exact("One S1003")),
];

/// Non-Acer machines that carry the legacy interface. Kept for compatibility
/// only.
pub static NON_ACER_QUIRKS: &[DmiEntry] = &[
    other(
        "Fujitsu Siemens Amilo Li 1718",
        "FUJITSU SIEMENS",
        "AMILO Li 1718",
        &QuirkRecord::FUJITSU_AMILO_LI_1718,
    ),
    other("Medion MD 98300", "MEDION", "WAM2030", &QuirkRecord::MEDION_MD_98300),
    other("Lenovo Ideapad S205", "LENOVO", "10382LG", &QuirkRecord::LENOVO_IDEAPAD_S205),
    other("Lenovo Ideapad S205 (Brazos)", "LENOVO", "Brazos", &QuirkRecord::LENOVO_IDEAPAD_S205),
    other("Lenovo 3000 N200", "LENOVO", "0687A31", &QuirkRecord::FUJITSU_AMILO_LI_1718),
    other("Lenovo Ideapad S205-10382JG", "LENOVO", "10382JG", &QuirkRecord::LENOVO_IDEAPAD_S205),
    other("Lenovo Ideapad S205-1038DPG", "LENOVO", "1038DPG", &QuirkRecord::LENOVO_IDEAPAD_S205),
];

/// Aspire One models expose a dummy interface.
static BLACKLIST: &[(&str, &str)] = &[("Acer", "AOA110"), ("Acer", "AOA150")];

static LEGACY_VENDORS: &[&str] = &["Acer", "Gateway", "Packard Bell"];

pub fn is_blacklisted(vendor: &str, model: &str) -> bool {
    BLACKLIST.iter().any(|&(v, m)| vendor.contains(v) && model.contains(m))
}

/// Whether the legacy interface may be driven on machines from this vendor
/// without a quirk entry.
pub fn legacy_vendor_whitelisted(vendor: &str) -> bool {
    LEGACY_VENDORS.iter().any(|&v| vendor.contains(v))
}

static DMI_TABLES: [&[DmiEntry]; 2] = [ACER_QUIRKS, NON_ACER_QUIRKS];

/// The built-in identity table.
#[derive(Clone, Copy, Debug)]
pub struct DmiTable {
    tables: &'static [&'static [DmiEntry]],
}

impl Default for DmiTable {
    fn default() -> Self { DmiTable { tables: &DMI_TABLES } }
}

impl DmiTable {
    pub fn entry(&self, vendor: &str, model: &str) -> Option<&'static DmiEntry> {
        self.tables
            .iter()
            .flat_map(|table| table.iter())
            .find(|entry| entry.vendor.matches(vendor) && entry.product.matches(model))
    }
}

impl QuirkLookup for DmiTable {
    fn lookup(&self, vendor: &str, model: &str) -> Option<QuirkMatch> {
        self.entry(vendor, model).map(|entry| {
            log::info!("found {}", entry.ident);
            entry.data
        })
    }
}

/// The quirk data in effect for this boot.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct QuirkSelection {
    pub record:     QuirkRecord,
    /// False when no entry matched and the empty record is in use.
    pub known:      bool,
    pub force_caps: Option<u32>,
}

/// Resolve quirks from configuration overrides, then the lookup service.
pub fn select(lookup: &dyn QuirkLookup, vendor: &str, model: &str, config: &Config) -> QuirkSelection {
    let mut selection =
        QuirkSelection { record: QuirkRecord::UNKNOWN, known: false, force_caps: config.force_caps };

    let mut apply = |found: QuirkMatch| match found {
        QuirkMatch::Record(record) => {
            selection.record = *record;
            selection.known = true;
        }
        QuirkMatch::ForceCaps(mask) => {
            if selection.force_caps.is_none() {
                log::info!("forcing capabilities to {:#x}", mask);
                selection.force_caps = Some(mask);
            }
        }
    };

    if config.predator_v4 {
        apply(QuirkMatch::Record(V4));
    } else if config.force_series == 0 {
        if let Some(found) = lookup.lookup(vendor, model) {
            apply(found);
        }
    } else if config.force_series == 2490 {
        apply(QuirkMatch::Record(TM2490));
    }

    selection
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_match_wins() {
        let table = DmiTable::default();
        assert_eq!(
            table.lookup("Acer", "Predator PH16-71"),
            Some(QuirkMatch::Record(&QuirkRecord::PREDATOR_TURBO))
        );
        assert_eq!(
            table.lookup("Acer", "Predator PH18-71"),
            Some(QuirkMatch::Record(&QuirkRecord::PREDATOR_V4))
        );
        assert_eq!(
            table.lookup("Acer", "Predator PT515-52"),
            Some(QuirkMatch::Record(&QuirkRecord::PREDATOR_TURBO_DUAL_GPU_FAN))
        );
    }

    #[test]
    fn substring_and_exact_matching() {
        let table = DmiTable::default();
        assert_eq!(
            table.lookup("Acer", "Aspire SW5-012 V1.0"),
            Some(QuirkMatch::ForceCaps(Attribute::KbdDock.bit()))
        );
        assert_eq!(table.lookup("Acer", "SW5-017"), Some(QuirkMatch::ForceCaps(0x40)));
        assert_eq!(table.lookup("Acer", "SW5-017 rev2"), None);
        assert_eq!(
            table.lookup("LENOVO", "Brazos"),
            Some(QuirkMatch::Record(&QuirkRecord::LENOVO_IDEAPAD_S205))
        );
        assert_eq!(table.lookup("Dell Inc.", "XPS 13"), None);
    }

    #[test]
    fn default_table_covers_both_vendors() {
        let table = DmiTable::default();
        assert_eq!(table.entry("Acer", "Aspire 1360").map(|entry| entry.ident), Some("Acer Aspire 1360"));
        assert_eq!(
            table.entry("MEDION", "WAM2030").map(|entry| entry.ident),
            Some("Medion MD 98300")
        );
        assert_eq!(
            table.tables.iter().map(|entries| entries.len()).sum::<usize>(),
            ACER_QUIRKS.len() + NON_ACER_QUIRKS.len()
        );
    }

    #[test]
    fn blacklist_and_whitelist() {
        assert!(is_blacklisted("Acer", "AOA150"));
        assert!(!is_blacklisted("Acer", "Aspire 5100"));
        assert!(legacy_vendor_whitelisted("Packard Bell BV"));
        assert!(!legacy_vendor_whitelisted("MEDION"));
    }

    #[test]
    fn quirk_capabilities() {
        let turbo = QuirkRecord::PREDATOR_TURBO.capabilities();
        assert!(turbo.supports(Attribute::TurboFan));
        assert!(turbo.supports(Attribute::TurboLed));
        assert!(turbo.supports(Attribute::TurboOverclock));
        assert!(!turbo.supports(Attribute::PlatformProfile));

        let v4 = QuirkRecord::PREDATOR_V4.capabilities();
        assert_eq!(
            v4,
            [Attribute::PlatformProfile, Attribute::FanSpeedRead].into_iter().collect()
        );

        assert!(QuirkRecord::ASPIRE_1520.capabilities().supports(Attribute::Brightness));
        assert!(QuirkRecord::UNKNOWN.capabilities().is_empty());
    }

    #[test]
    fn selection_precedence() {
        let table = DmiTable::default();

        let config = Config { predator_v4: true, ..Config::default() };
        let selected = select(&table, "Acer", "Aspire 5100", &config);
        assert_eq!(selected.record, QuirkRecord::PREDATOR_V4);

        let config = Config { force_series: 2490, ..Config::default() };
        let selected = select(&table, "Acer", "Predator PH16-71", &config);
        assert_eq!(selected.record, QuirkRecord::TRAVELMATE_2490);

        let config = Config { force_caps: Some(0x3), ..Config::default() };
        let selected = select(&table, "Acer", "Aspire SW3-016", &config);
        assert_eq!(selected.force_caps, Some(0x3));
        assert!(!selected.known);

        let selected = select(&table, "Acer", "Aspire SW3-016", &Config::default());
        assert_eq!(selected.force_caps, Some(0x40));
    }
}
