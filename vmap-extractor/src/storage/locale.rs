//! Client locales and the storage locale mask

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Locale bits as reported by the client storage
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct LocaleMask: u32 {
        const ENUS = 0x0000_0002;
        const KOKR = 0x0000_0004;
        const FRFR = 0x0000_0010;
        const DEDE = 0x0000_0020;
        const ZHCN = 0x0000_0040;
        const ESES = 0x0000_0080;
        const ZHTW = 0x0000_0100;
        const ENGB = 0x0000_0200;
        const ENCN = 0x0000_0400;
        const ENTW = 0x0000_0800;
        const ESMX = 0x0000_1000;
        const RURU = 0x0000_2000;
        const PTBR = 0x0000_4000;
        const ITIT = 0x0000_8000;
        const PTPT = 0x0001_0000;
    }
}

impl LocaleMask {
    /// Map a storage locale tag (`enUS`, `ptPT`, ...) to its bit
    pub fn from_tag(tag: &str) -> Option<Self> {
        let flag = match tag {
            "enUS" => Self::ENUS,
            "koKR" => Self::KOKR,
            "frFR" => Self::FRFR,
            "deDE" => Self::DEDE,
            "zhCN" => Self::ZHCN,
            "esES" => Self::ESES,
            "zhTW" => Self::ZHTW,
            "enGB" => Self::ENGB,
            "enCN" => Self::ENCN,
            "enTW" => Self::ENTW,
            "esMX" => Self::ESMX,
            "ruRU" => Self::RURU,
            "ptBR" => Self::PTBR,
            "itIT" => Self::ITIT,
            "ptPT" => Self::PTPT,
            _ => return None,
        };
        Some(flag)
    }
}

/// Game locales in client order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Locale {
    EnUs,
    KoKr,
    FrFr,
    DeDe,
    ZhCn,
    ZhTw,
    EsEs,
    EsMx,
    RuRu,
    /// Placeholder slot, never probed
    None,
    PtBr,
    ItIt,
}

impl Locale {
    /// Every locale in probing order
    pub const ALL: [Locale; 12] = [
        Locale::EnUs,
        Locale::KoKr,
        Locale::FrFr,
        Locale::DeDe,
        Locale::ZhCn,
        Locale::ZhTw,
        Locale::EsEs,
        Locale::EsMx,
        Locale::RuRu,
        Locale::None,
        Locale::PtBr,
        Locale::ItIt,
    ];

    /// Storage locale bits that satisfy this locale
    pub fn storage_flags(self) -> LocaleMask {
        match self {
            Locale::EnUs => LocaleMask::ENUS | LocaleMask::ENGB,
            Locale::KoKr => LocaleMask::KOKR,
            Locale::FrFr => LocaleMask::FRFR,
            Locale::DeDe => LocaleMask::DEDE,
            Locale::ZhCn => LocaleMask::ZHCN,
            Locale::ZhTw => LocaleMask::ZHTW,
            Locale::EsEs => LocaleMask::ESES,
            Locale::EsMx => LocaleMask::ESMX,
            Locale::RuRu => LocaleMask::RURU,
            Locale::None => LocaleMask::empty(),
            Locale::PtBr => LocaleMask::PTBR | LocaleMask::PTPT,
            Locale::ItIt => LocaleMask::ITIT,
        }
    }

    /// Locale name as used in client paths
    pub fn name(self) -> &'static str {
        match self {
            Locale::EnUs => "enUS",
            Locale::KoKr => "koKR",
            Locale::FrFr => "frFR",
            Locale::DeDe => "deDE",
            Locale::ZhCn => "zhCN",
            Locale::ZhTw => "zhTW",
            Locale::EsEs => "esES",
            Locale::EsMx => "esMX",
            Locale::RuRu => "ruRU",
            Locale::None => "none",
            Locale::PtBr => "ptBR",
            Locale::ItIt => "itIT",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
