//! Ordered pattern tables mapping column names to business meanings.
//!
//! Each type category has its own table; the first rule whose matcher fires
//! wins. Column names are compared lowercased.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    DateTime,
    Numeric,
    Boolean,
    Text,
    Other,
}

impl TypeCategory {
    pub fn of(data_type: &str) -> Self {
        let t = data_type.trim().to_lowercase();

        if t.starts_with("interval") {
            TypeCategory::Other
        } else if t.contains("date") || t.contains("time") {
            TypeCategory::DateTime
        } else if t.starts_with("bool") {
            TypeCategory::Boolean
        } else if ["int", "numeric", "decimal", "real", "double", "float", "money", "serial"]
            .iter()
            .any(|n| t.contains(n))
        {
            TypeCategory::Numeric
        } else if ["char", "text", "string"].iter().any(|n| t.contains(n)) {
            TypeCategory::Text
        } else {
            TypeCategory::Other
        }
    }
}

/// Fires when the name contains any substring, has any `_`-separated word,
/// or ends with any suffix.
#[derive(Debug)]
pub struct Matcher {
    pub contains: &'static [&'static str],
    pub words: &'static [&'static str],
    pub suffixes: &'static [&'static str],
}

impl Matcher {
    pub fn matches(&self, name: &str) -> bool {
        self.contains.iter().any(|p| name.contains(p))
            || name.split('_').any(|w| self.words.contains(&w))
            || self.suffixes.iter().any(|s| name.ends_with(s))
    }
}

#[derive(Debug)]
pub enum Label {
    Fixed(&'static str),
    /// "Indicates if the record ..." built from the flag name.
    Flag,
}

impl Label {
    fn render(&self, name: &str) -> String {
        match self {
            Label::Fixed(text) => text.to_string(),
            Label::Flag => {
                let subject = name.replace("is_", "").replace("has_", "").replace('_', " ");
                format!("Indicates if the record {}", subject.trim())
            }
        }
    }
}

#[derive(Debug)]
pub struct Rule {
    pub matcher: Matcher,
    pub label: Label,
}

const fn contains(patterns: &'static [&'static str], label: &'static str) -> Rule {
    Rule {
        matcher: Matcher { contains: patterns, words: &[], suffixes: &[] },
        label: Label::Fixed(label),
    }
}

const fn words(patterns: &'static [&'static str], label: &'static str) -> Rule {
    Rule {
        matcher: Matcher { contains: &[], words: patterns, suffixes: &[] },
        label: Label::Fixed(label),
    }
}

pub const DATE_RULES: &[Rule] = &[
    contains(&["created", "creation", "inserted"], "Date when the record was created"),
    contains(&["updated", "modified", "changed"], "Date when the record was last updated"),
    contains(&["deleted", "removed", "archived"], "Date when the record was soft-deleted"),
    contains(&["deliver", "received", "arriv"], "Date when items were actually delivered to the customer"),
    Rule {
        matcher: Matcher { contains: &["dispatch", "ship"], words: &["sent"], suffixes: &[] },
        label: Label::Fixed("Date when items were dispatched for delivery"),
    },
    contains(&["order", "purchase", "placed"], "Date when the order was placed"),
    Rule {
        matcher: Matcher { contains: &["paid", "payment"], words: &["pay"], suffixes: &[] },
        label: Label::Fixed("Date when payment was made"),
    },
    contains(&["due", "deadline", "expir"], "Due date or deadline"),
    Rule {
        matcher: Matcher { contains: &["start", "begin"], words: &["from"], suffixes: &[] },
        label: Label::Fixed("Start of a period"),
    },
    words(&["end", "ends", "ended", "finish", "finished", "until", "to"], "End of a period"),
];

pub const NUMERIC_RULES: &[Rule] = &[
    contains(&["price", "cost", "amount"], "Monetary value"),
    // "count" as a word only, so "discount" reaches its own rule
    Rule {
        matcher: Matcher { contains: &["quantity", "number", "qty"], words: &["count"], suffixes: &[] },
        label: Label::Fixed("Quantity or count"),
    },
    contains(&["discount"], "Discount value (possibly percentage)"),
    contains(&["total"], "Total calculated value"),
    Rule {
        matcher: Matcher { contains: &[], words: &[], suffixes: &["_id", "id", "_key", "uuid", "guid"] },
        label: Label::Fixed("Identifier or foreign key"),
    },
];

pub const BOOLEAN_RULES: &[Rule] = &[
    Rule {
        matcher: Matcher { contains: &["is_", "has_"], words: &[], suffixes: &[] },
        label: Label::Flag,
    },
    contains(&["active", "enabled"], "Indicates if record is active or enabled"),
];

pub const TEXT_RULES: &[Rule] = &[
    contains(&["status", "state", "condition"], "Status or state of the record"),
    contains(&["name"], "Name or title"),
    contains(&["description", "desc"], "Descriptive text"),
    contains(&["code"], "Code or identifier"),
    contains(&["address"], "Address"),
    contains(&["email"], "Email"),
    contains(&["phone"], "Phone"),
];

fn rules_for(category: TypeCategory) -> &'static [Rule] {
    match category {
        TypeCategory::DateTime => DATE_RULES,
        TypeCategory::Numeric => NUMERIC_RULES,
        TypeCategory::Boolean => BOOLEAN_RULES,
        TypeCategory::Text => TEXT_RULES,
        TypeCategory::Other => &[],
    }
}

fn identifier_fallback(name: &str) -> Option<String> {
    let relation = if name == "id" {
        ""
    } else {
        name.strip_suffix("_id")?
    };

    let relation = relation.replace('_', " ");
    let relation = relation.trim();
    if relation.is_empty() {
        Some("Primary identifier".to_string())
    } else {
        Some(format!("Identifier for a {}", relation))
    }
}

/// Name/type rules only; stored comments are handled by the caller.
/// Returns an empty string when nothing matches.
pub fn infer_from_rules(column: &str, data_type: &str) -> String {
    let name = column.to_lowercase();

    rules_for(TypeCategory::of(data_type))
        .iter()
        .find(|rule| rule.matcher.matches(&name))
        .map(|rule| rule.label.render(&name))
        .or_else(|| identifier_fallback(&name))
        .unwrap_or_default()
}
