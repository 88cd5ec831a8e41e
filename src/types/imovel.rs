//! Property tax records.

use serde::{Deserialize, Serialize};

/// A property as registered in the municipal tax roll.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Imovel {
    /// Cadastral identifier (SQL in Sao Paulo, indice cadastral elsewhere)
    pub sql: String,
    pub logradouro: String,
    pub numero: String,
    pub bairro: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cep: Option<String>,
    /// Land area in m2
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_terreno: Option<f64>,
    /// Built area in m2
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_construida: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valor_venal: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valor_venal_terreno: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valor_venal_construcao: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ano_construcao: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uso: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub padrao: Option<String>,
    /// Street frontage in meters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub testada: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fracao_ideal: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantidade_pavimentos: Option<u32>,
}

impl Imovel {
    /// Assessed value per built m2, when both figures are known.
    pub fn valor_venal_m2(&self) -> Option<f64> {
        match (self.valor_venal, self.area_construida) {
            (Some(valor), Some(area)) if area > 0.0 => Some(valor / area),
            _ => None,
        }
    }
}

/// Zoning rules at a coordinate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Zoneamento {
    pub zona: String,
    pub uso_permitido: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coeficiente_aproveitamento: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taxa_ocupacao: Option<f64>,
    /// Height limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gabarito: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recuo_frontal: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legislacao: Option<String>,
}
