//! Market valuation records and request parameters.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::Cidade;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Valuation {
    pub valor_estimado: f64,
    pub valor_minimo: f64,
    pub valor_maximo: f64,
    /// Confidence score in `[0, 1]`
    pub confianca: f64,
    pub valor_m2: f64,
    pub metodologia: String,
    pub data_referencia: String,
}

/// A nearby property used as a price reference.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Comparavel {
    pub sql: String,
    pub logradouro: String,
    pub bairro: String,
    pub area_construida: f64,
    pub valor_venal: f64,
    pub valor_m2: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distancia_km: Option<f64>,
}

/// Estimate from the automated valuation model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AvmEstimate {
    pub valor_estimado: f64,
    pub valor_minimo: f64,
    pub valor_maximo: f64,
    pub valor_m2: f64,
    pub confianca: f64,
    pub modelo_versao: String,
}

/// Estimate derived from recorded ITBI transactions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItbiMarketEstimate {
    pub valor_estimado: f64,
    pub faixa_minima: f64,
    pub faixa_maxima: f64,
    pub valor_m2_mediana: f64,
    pub total_transacoes: u32,
    pub periodo: String,
    pub fonte: String,
}

/// Weighted combination of the AVM and ITBI estimates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FinalValuation {
    pub estimado: f64,
    pub minimo: f64,
    pub maximo: f64,
    pub metodo: String,
    pub peso_avm: f64,
    pub peso_itbi: f64,
    pub confianca: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nota: Option<String>,
}

/// Full evaluation of a property: tax data, both estimates and the final value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertyEvaluation {
    #[serde(default)]
    pub imovel: Map<String, Value>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub avaliacao_avm: Option<AvmEstimate>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub avaliacao_itbi: Option<ItbiMarketEstimate>,
    pub valor_final: FinalValuation,
    #[serde(default)]
    pub comparaveis: Option<Value>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl PropertyEvaluation {
    pub fn valor_estimado(&self) -> f64 {
        self.valor_final.estimado
    }

    /// Data sources listed under `metadata.fontes`.
    pub fn fontes_utilizadas(&self) -> Vec<String> {
        self.metadata
            .get("fontes")
            .and_then(Value::as_array)
            .map(|fontes| {
                fontes
                    .iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// The service sends `{}` or `null` when an estimate is unavailable.
fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Object(map) if map.is_empty() => Ok(None),
        value => serde_json::from_value(value)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Parameters of `GET /valuation/estimate`.
#[derive(Clone, Debug, PartialEq)]
pub struct EstimateRequest {
    pub area_terreno: f64,
    pub area_construida: f64,
    pub bairro: String,
    pub cidade: Cidade,
    pub zona: Option<String>,
    pub tipo_uso: Option<String>,
    pub tipo_padrao: Option<String>,
    pub ano_construcao: Option<i32>,
}

impl EstimateRequest {
    pub fn new(area_terreno: f64, area_construida: f64, bairro: impl Into<String>) -> Self {
        Self {
            area_terreno,
            area_construida,
            bairro: bairro.into(),
            cidade: Cidade::default(),
            zona: None,
            tipo_uso: None,
            tipo_padrao: None,
            ano_construcao: None,
        }
    }

    pub fn cidade(mut self, cidade: impl Into<Cidade>) -> Self {
        self.cidade = cidade.into();
        self
    }

    /// Use zone, e.g. `ZM`.
    pub fn zona(mut self, zona: impl Into<String>) -> Self {
        self.zona = Some(zona.into());
        self
    }

    pub fn tipo_uso(mut self, tipo_uso: impl Into<String>) -> Self {
        self.tipo_uso = Some(tipo_uso.into());
        self
    }

    pub fn tipo_padrao(mut self, tipo_padrao: impl Into<String>) -> Self {
        self.tipo_padrao = Some(tipo_padrao.into());
        self
    }

    pub fn ano_construcao(mut self, ano: i32) -> Self {
        self.ano_construcao = Some(ano);
        self
    }
}

pub const DEFAULT_COMPARABLES_LIMIT: u32 = 10;

/// Parameters of `GET /valuation/comparables`.
#[derive(Clone, Debug, PartialEq)]
pub struct ComparablesRequest {
    pub bairro: String,
    pub area_min: f64,
    pub area_max: f64,
    pub cidade: Cidade,
    pub limit: u32,
}

impl ComparablesRequest {
    pub fn new(bairro: impl Into<String>, area_min: f64, area_max: f64) -> Self {
        Self {
            bairro: bairro.into(),
            area_min,
            area_max,
            cidade: Cidade::default(),
            limit: DEFAULT_COMPARABLES_LIMIT,
        }
    }

    pub fn cidade(mut self, cidade: impl Into<Cidade>) -> Self {
        self.cidade = cidade.into();
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valor_final() -> Value {
        json!({
            "estimado": 1200000.0,
            "minimo": 1100000.0,
            "maximo": 1300000.0,
            "metodo": "ponderado",
            "peso_avm": 0.6,
            "peso_itbi": 0.4,
            "confianca": 0.85
        })
    }

    #[test]
    fn test_property_evaluation_full() {
        let evaluation: PropertyEvaluation = serde_json::from_value(json!({
            "imovel": {"sql": "008.045.0123-4"},
            "avaliacao_avm": {
                "valor_estimado": 1250000.0,
                "valor_minimo": 1150000.0,
                "valor_maximo": 1350000.0,
                "valor_m2": 12500.0,
                "confianca": 0.9,
                "modelo_versao": "v2.1"
            },
            "avaliacao_itbi": {
                "valor_estimado": 1150000.0,
                "faixa_minima": 1000000.0,
                "faixa_maxima": 1300000.0,
                "valor_m2_mediana": 11500.0,
                "total_transacoes": 42,
                "periodo": "2023-2024",
                "fonte": "ITBI SP"
            },
            "valor_final": valor_final(),
            "metadata": {"fontes": ["iptu", "avm", "itbi"]}
        }))
        .unwrap();

        assert_eq!(evaluation.valor_estimado(), 1200000.0);
        assert_eq!(evaluation.fontes_utilizadas(), vec!["iptu", "avm", "itbi"]);
        assert_eq!(evaluation.avaliacao_avm.unwrap().modelo_versao, "v2.1");
        assert_eq!(evaluation.avaliacao_itbi.unwrap().total_transacoes, 42);
        assert!(evaluation.valor_final.nota.is_none());
    }

    #[test]
    fn test_property_evaluation_missing_estimates() {
        let evaluation: PropertyEvaluation = serde_json::from_value(json!({
            "avaliacao_avm": {},
            "avaliacao_itbi": null,
            "valor_final": valor_final()
        }))
        .unwrap();

        assert!(evaluation.avaliacao_avm.is_none());
        assert!(evaluation.avaliacao_itbi.is_none());
        assert!(evaluation.imovel.is_empty());
        assert!(evaluation.fontes_utilizadas().is_empty());
    }

    #[test]
    fn test_request_defaults() {
        let estimate = EstimateRequest::new(250.0, 180.0, "Pinheiros").zona("ZM");
        assert_eq!(estimate.cidade, Cidade::SaoPaulo);
        assert_eq!(estimate.zona.as_deref(), Some("ZM"));
        assert!(estimate.ano_construcao.is_none());

        let comparables = ComparablesRequest::new("Pinheiros", 100.0, 200.0).cidade("bh");
        assert_eq!(comparables.limit, 10);
        assert_eq!(comparables.cidade, Cidade::BeloHorizonte);
    }
}
