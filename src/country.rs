//! Country-name to ISO alpha-2 lookup. Failure is non-fatal: an unknown
//! country leaves the code empty, which relaxes the country filter.

use deunicode::deunicode;

/// Common country spellings seen in scholarly affiliation metadata, folded
/// to lowercase ASCII. Variants map to the same code.
static COUNTRY_CODES: &[(&str, &str)] = &[
    ("france", "fr"),
    ("united states", "us"),
    ("united states of america", "us"),
    ("usa", "us"),
    ("united kingdom", "gb"),
    ("uk", "gb"),
    ("great britain", "gb"),
    ("england", "gb"),
    ("scotland", "gb"),
    ("germany", "de"),
    ("italy", "it"),
    ("spain", "es"),
    ("portugal", "pt"),
    ("belgium", "be"),
    ("netherlands", "nl"),
    ("the netherlands", "nl"),
    ("luxembourg", "lu"),
    ("switzerland", "ch"),
    ("austria", "at"),
    ("ireland", "ie"),
    ("denmark", "dk"),
    ("norway", "no"),
    ("sweden", "se"),
    ("finland", "fi"),
    ("iceland", "is"),
    ("poland", "pl"),
    ("czech republic", "cz"),
    ("czechia", "cz"),
    ("slovakia", "sk"),
    ("hungary", "hu"),
    ("romania", "ro"),
    ("bulgaria", "bg"),
    ("greece", "gr"),
    ("turkey", "tr"),
    ("russia", "ru"),
    ("russian federation", "ru"),
    ("ukraine", "ua"),
    ("china", "cn"),
    ("people's republic of china", "cn"),
    ("hong kong", "hk"),
    ("taiwan", "tw"),
    ("japan", "jp"),
    ("south korea", "kr"),
    ("republic of korea", "kr"),
    ("korea", "kr"),
    ("india", "in"),
    ("pakistan", "pk"),
    ("iran", "ir"),
    ("israel", "il"),
    ("saudi arabia", "sa"),
    ("united arab emirates", "ae"),
    ("qatar", "qa"),
    ("egypt", "eg"),
    ("morocco", "ma"),
    ("algeria", "dz"),
    ("tunisia", "tn"),
    ("south africa", "za"),
    ("nigeria", "ng"),
    ("canada", "ca"),
    ("mexico", "mx"),
    ("brazil", "br"),
    ("argentina", "ar"),
    ("chile", "cl"),
    ("colombia", "co"),
    ("peru", "pe"),
    ("australia", "au"),
    ("new zealand", "nz"),
    ("singapore", "sg"),
    ("malaysia", "my"),
    ("indonesia", "id"),
    ("thailand", "th"),
    ("vietnam", "vn"),
    ("viet nam", "vn"),
    ("philippines", "ph"),
];

/// Fuzzy-match a free-text country name to a 2-letter lowercase code.
///
/// Matching order: already-a-code, exact folded name, then containment in
/// either direction ("France (Metropolitan)" still resolves to `fr`).
pub fn to_alpha2(name: &str) -> Option<&'static str> {
    let folded = deunicode(name).to_lowercase();
    let needle = folded.trim();
    if needle.is_empty() {
        return None;
    }

    if needle.len() == 2 {
        if let Some((_, code)) = COUNTRY_CODES.iter().find(|(_, c)| *c == needle) {
            return Some(code);
        }
    }

    if let Some((_, code)) = COUNTRY_CODES.iter().find(|(n, _)| *n == needle) {
        return Some(code);
    }

    COUNTRY_CODES
        .iter()
        .find(|(n, _)| needle.contains(n) || n.contains(needle))
        .map(|(_, code)| *code)
}
