/// Validity flag of a directory entry. `Valid` entries are curated; the
/// invalid-mode probe omits the clause entirely instead of filtering on the
/// unvetted states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    Valid,
}

impl Validity {
    fn as_str(self) -> &'static str {
        match self {
            Validity::Valid => "VALID",
        }
    }
}

/// Typed builder for HAL reference queries. The provider's query grammar is
/// rendered in [`RefQuery::to_query_string`] and nowhere else.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefQuery {
    text: String,
    exact: bool,
    validity: Option<Validity>,
    country: Option<String>,
    parent_id: Option<String>,
}

impl RefQuery {
    /// Fuzzy full-text match on the search term.
    pub fn text_matches(term: &str) -> Self {
        RefQuery {
            text: sanitize(term),
            exact: false,
            ..RefQuery::default()
        }
    }

    /// Quoted phrase match, used by the invalid-affiliation pass.
    pub fn text_exact(term: &str) -> Self {
        RefQuery {
            text: sanitize(term),
            exact: true,
            ..RefQuery::default()
        }
    }

    pub fn with_validity(mut self, validity: Validity) -> Self {
        self.validity = Some(validity);
        self
    }

    pub fn with_country(mut self, code: &str) -> Self {
        self.country = Some(code.to_string());
        self
    }

    pub fn with_parent(mut self, parent_id: &str) -> Self {
        self.parent_id = Some(parent_id.to_string());
        self
    }

    pub fn to_query_string(&self) -> String {
        let mut clauses = Vec::with_capacity(4);
        if self.exact {
            clauses.push(format!("text:\"{}\"", self.text));
        } else {
            clauses.push(format!("text:({})", self.text));
        }
        if let Some(validity) = self.validity {
            clauses.push(format!("valid_s:\"{}\"", validity.as_str()));
        }
        if let Some(country) = &self.country {
            clauses.push(format!("country_s:\"{}\"", country));
        }
        if let Some(parent_id) = &self.parent_id {
            clauses.push(format!("parentDocid_i:\"{}\"", parent_id));
        }
        format!("({})", clauses.join(" "))
    }
}

/// Ampersands break the Solr query parser; entity remnants and bare `&` both
/// become plain spaces, as the directory itself tokenizes them.
fn sanitize(term: &str) -> String {
    term.replace("&amp;", " ").replace('&', " ")
}
