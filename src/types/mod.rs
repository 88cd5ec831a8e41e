//! Domain records returned by the IPTU API.

pub mod imovel;
pub mod itbi;
pub mod valuation;

pub use imovel::{Imovel, Zoneamento};
pub use itbi::{
    CalculoRequest, GuiaRequest, ItbiAliquota, ItbiCalculo, ItbiGuia, ItbiHistorico, ItbiIsencao,
    ItbiSimulacao, ItbiStatus, ItbiValidacao, Parte, SimulacaoRequest,
};
pub use valuation::{
    AvmEstimate, ComparablesRequest, Comparavel, EstimateRequest, FinalValuation,
    ItbiMarketEstimate, PropertyEvaluation, Valuation,
};

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// City served by the API, sent as its short code.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Cidade {
    #[default]
    SaoPaulo,
    BeloHorizonte,
    Recife,
    /// Any code the service may add later.
    Other(String),
}

impl Cidade {
    pub fn code(&self) -> &str {
        match self {
            Self::SaoPaulo => "sp",
            Self::BeloHorizonte => "bh",
            Self::Recife => "recife",
            Self::Other(code) => code,
        }
    }
}

impl From<&str> for Cidade {
    fn from(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "sp" => Self::SaoPaulo,
            "bh" => Self::BeloHorizonte,
            "recife" => Self::Recife,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for Cidade {
    fn from(code: String) -> Self {
        Self::from(code.as_str())
    }
}

impl From<&Cidade> for Cidade {
    fn from(cidade: &Cidade) -> Self {
        cidade.clone()
    }
}

impl fmt::Display for Cidade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl Serialize for Cidade {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for Cidade {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}
