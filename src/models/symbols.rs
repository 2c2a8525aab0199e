use std::collections::HashMap;

/// Source-table symbols whose provider spelling differs (share classes).
const DEFAULT_ALIASES: [(&str, &str); 12] = [
    ("ARTN.A", "ARTNA"),
    ("BF.A", "BF-A"),
    ("BF.B", "BF-B"),
    ("AGM.A", "AGM-A"),
    ("CWEN.A", "CWEN-A"),
    ("DGIC.A", "DGICA"),
    ("DGIC.B", "DGICB"),
    ("FCNC.A", "FCNCA"),
    ("MKC.V", "MKC-V"),
    ("RUSH.A", "RUSHA"),
    ("RUSH.B", "RUSHB"),
    ("WSO.B", "WSO-B"),
];

/// Bidirectional mapping between source-format and provider-format symbols.
/// Symbols without an entry translate to themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolAliases {
    to_provider: HashMap<String, String>,
    to_source: HashMap<String, String>,
}

impl SymbolAliases {
    pub fn new<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        let mut to_provider = HashMap::new();
        let mut to_source = HashMap::new();
        for (source, provider) in pairs {
            let (source, provider) = (source.into(), provider.into());
            to_source.insert(provider.clone(), source.clone());
            to_provider.insert(source, provider);
        }
        Self { to_provider, to_source }
    }

    pub fn to_provider<'a>(&'a self, symbol: &'a str) -> &'a str {
        self.to_provider.get(symbol).map(String::as_str).unwrap_or(symbol)
    }

    pub fn to_source<'a>(&'a self, symbol: &'a str) -> &'a str {
        self.to_source.get(symbol).map(String::as_str).unwrap_or(symbol)
    }

    pub fn needs_conversion(&self, symbol: &str) -> bool {
        self.to_provider.contains_key(symbol)
    }

    pub fn len(&self) -> usize {
        self.to_provider.len()
    }

    pub fn is_empty(&self) -> bool {
        self.to_provider.is_empty()
    }
}

impl Default for SymbolAliases {
    fn default() -> Self {
        Self::new(DEFAULT_ALIASES)
    }
}
