//! Minimal English inflection for the convention-over-configuration key
//! defaults (`singular(table) + "_id"` and friends). Covers regular plurals
//! and a small irregular table; anything unusual is overridable per node.

const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
    ("foot", "feet"),
    ("tooth", "teeth"),
    ("mouse", "mice"),
    ("goose", "geese"),
];

pub fn plural(word: &str) -> String {
    for (singular, plural) in IRREGULAR {
        if word == *singular {
            return (*plural).to_string();
        }
        if word == *plural {
            return (*plural).to_string();
        }
    }
    if let Some(stem) = word.strip_suffix('y') {
        if !stem.is_empty() && !ends_with_vowel(stem) {
            return format!("{}ies", stem);
        }
    }
    if word.ends_with('s')
        || word.ends_with('x')
        || word.ends_with('z')
        || word.ends_with("ch")
        || word.ends_with("sh")
    {
        return format!("{}es", word);
    }
    format!("{}s", word)
}

pub fn singular(word: &str) -> String {
    for (singular, plural) in IRREGULAR {
        if word == *plural {
            return (*singular).to_string();
        }
        if word == *singular {
            return (*singular).to_string();
        }
    }
    if let Some(stem) = word.strip_suffix("ies") {
        if !stem.is_empty() {
            return format!("{}y", stem);
        }
    }
    if let Some(stem) = word.strip_suffix("es") {
        if stem.ends_with("ss")
            || stem.ends_with('x')
            || stem.ends_with('z')
            || stem.ends_with("ch")
            || stem.ends_with("sh")
        {
            return stem.to_string();
        }
    }
    if word.ends_with('s') && !word.ends_with("ss") {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}

fn ends_with_vowel(word: &str) -> bool {
    matches!(
        word.chars().next_back(),
        Some('a') | Some('e') | Some('i') | Some('o') | Some('u')
    )
}
