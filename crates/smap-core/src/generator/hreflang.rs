//! hreflang alternate groups.

use std::collections::HashMap;

use crate::entry::{Alternate, UrlEntry};
use crate::language::LanguageSettings;

/// hreflang value of the fallback alternate.
pub const X_DEFAULT: &str = "x-default";

/// Attach alternates to every entry sharing a `canonical_path`.
///
/// Entries without a canonical path pass through untouched, as do groups
/// with a single distinct `loc`. Input should already be sorted so the
/// fallback default entry is deterministic.
pub fn attach_alternates(mut entries: Vec<UrlEntry>, languages: &LanguageSettings) -> Vec<UrlEntry> {
    let mut groups: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, entry) in entries.iter().enumerate() {
        if let Some(path) = entry.canonical_path.as_deref() {
            groups.entry(path).or_default().push(i);
        }
    }

    let computed: Vec<(Vec<usize>, Vec<Alternate>)> = groups
        .into_values()
        .filter_map(|members| {
            let alternates = group_alternates(&entries, &members, languages)?;
            Some((members, alternates))
        })
        .collect();

    for (members, alternates) in computed {
        for i in members {
            entries[i].alternates.clone_from(&alternates);
        }
    }
    entries
}

fn group_alternates(
    entries: &[UrlEntry],
    members: &[usize],
    languages: &LanguageSettings,
) -> Option<Vec<Alternate>> {
    let group: Vec<&UrlEntry> = members.iter().map(|&i| &entries[i]).collect();
    let first = group.first()?;
    if group.iter().all(|e| e.loc == first.loc) {
        return None;
    }

    let default_entry = group
        .iter()
        .find(|e| languages.language_segment_in(&e.loc).is_none())
        .unwrap_or(first);

    let default_code = languages.default_base_code();
    let mut alternates: Vec<Alternate> = group
        .iter()
        .map(|e| {
            let hreflang = languages
                .language_segment_in(&e.loc)
                .unwrap_or_else(|| default_code.clone());
            Alternate::new(hreflang, e.loc.clone())
        })
        .collect();
    alternates.sort_by(|a, b| a.hreflang.cmp(&b.hreflang).then_with(|| a.href.cmp(&b.href)));
    alternates.dedup();
    alternates.push(Alternate::new(X_DEFAULT, default_entry.loc.clone()));
    Some(alternates)
}
