//! Static per-language facts.

use crate::grapheme::Script;
use crate::keyboard::KeyboardLayout;

/// What the engine needs to know about one supported language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguageProfile {
    pub code: &'static str,
    pub name: &'static str,
    pub native_name: &'static str,
    pub script: Script,
    pub layout: KeyboardLayout,
    /// Users commonly type this language in Roman letters.
    pub transliterating: bool,
}

const fn profile(
    code: &'static str,
    name: &'static str,
    native_name: &'static str,
    script: Script,
    layout: KeyboardLayout,
    transliterating: bool,
) -> LanguageProfile {
    LanguageProfile {
        code,
        name,
        native_name,
        script,
        layout,
        transliterating,
    }
}

static PROFILES: &[LanguageProfile] = &[
    profile("en", "English", "English", Script::Latin, KeyboardLayout::Qwerty, false),
    profile("es", "Spanish", "Español", Script::Latin, KeyboardLayout::Qwerty, false),
    profile("fr", "French", "Français", Script::Latin, KeyboardLayout::Azerty, false),
    profile("de", "German", "Deutsch", Script::Latin, KeyboardLayout::Qwertz, false),
    profile("pt", "Portuguese", "Português", Script::Latin, KeyboardLayout::Qwerty, false),
    profile("it", "Italian", "Italiano", Script::Latin, KeyboardLayout::Qwerty, false),
    profile("hi", "Hindi", "हिन्दी", Script::Devanagari, KeyboardLayout::Native, true),
    profile("mr", "Marathi", "मराठी", Script::Devanagari, KeyboardLayout::Native, true),
    profile("bn", "Bengali", "বাংলা", Script::Bengali, KeyboardLayout::Native, true),
    profile("gu", "Gujarati", "ગુજરાતી", Script::Gujarati, KeyboardLayout::Native, true),
    profile("ta", "Tamil", "தமிழ்", Script::Tamil, KeyboardLayout::Native, true),
    profile("te", "Telugu", "తెలుగు", Script::Telugu, KeyboardLayout::Native, true),
    profile("kn", "Kannada", "ಕನ್ನಡ", Script::Kannada, KeyboardLayout::Native, true),
    profile("ml", "Malayalam", "മലയാളം", Script::Malayalam, KeyboardLayout::Native, true),
    profile("ar", "Arabic", "العربية", Script::Arabic, KeyboardLayout::Native, false),
    profile("ru", "Russian", "Русский", Script::Cyrillic, KeyboardLayout::Native, false),
];

impl LanguageProfile {
    /// Profile for a language code, case-insensitive.
    pub fn for_code(code: &str) -> Option<&'static LanguageProfile> {
        PROFILES.iter().find(|p| p.code.eq_ignore_ascii_case(code))
    }

    /// Profile for `code`, or a Latin/QWERTY profile for unknown codes.
    pub fn or_default(code: &str) -> LanguageProfile {
        match Self::for_code(code) {
            Some(p) => *p,
            None => profile("", "Unknown", "Unknown", Script::Latin, KeyboardLayout::Qwerty, false),
        }
    }

    pub fn all() -> &'static [LanguageProfile] {
        PROFILES
    }

    pub fn is_indic(&self) -> bool {
        self.script.is_indic()
    }
}
