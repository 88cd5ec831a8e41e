//! ITBI (property transfer tax) records and request bodies.

use serde::{Deserialize, Serialize};

use super::Cidade;

/// Processing state of an ITBI transaction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItbiStatus {
    pub protocolo: String,
    pub status: String,
    pub data_solicitacao: String,
    pub valor_transacao: f64,
    pub valor_venal_referencia: f64,
    pub base_calculo: f64,
    pub aliquota: f64,
    pub valor_itbi: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_aprovacao: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItbiCalculo {
    pub sql: String,
    pub valor_transacao: f64,
    pub valor_venal_referencia: f64,
    /// Greater of the transaction value and the reference value
    pub base_calculo: f64,
    pub aliquota: f64,
    pub valor_itbi: f64,
    pub isencao_aplicavel: bool,
    pub fundamentacao_legal: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItbiHistorico {
    pub protocolo: String,
    pub data_transacao: String,
    pub tipo_transacao: String,
    pub valor_transacao: f64,
    pub valor_itbi: f64,
}

/// Rates in force for a city.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItbiAliquota {
    pub cidade: String,
    pub aliquota_padrao: f64,
    /// Reduced rate on the SFH-financed share
    pub aliquota_financiamento_sfh: f64,
    pub valor_minimo_isencao: f64,
    pub base_legal: String,
    pub vigencia: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItbiIsencao {
    pub tipo: String,
    pub descricao: String,
    #[serde(default)]
    pub requisitos: Vec<String>,
    pub base_legal: String,
}

/// Payment slip issued for a transaction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItbiGuia {
    pub protocolo: String,
    pub codigo_barras: String,
    pub linha_digitavel: String,
    pub data_emissao: String,
    pub data_vencimento: String,
    pub valor_itbi: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItbiValidacao {
    pub protocolo: String,
    pub valido: bool,
    pub pago: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_pagamento: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valor_pago: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItbiSimulacao {
    pub valor_transacao: f64,
    pub valor_financiado: f64,
    pub valor_nao_financiado: f64,
    pub aliquota_sfh: f64,
    pub aliquota_padrao: f64,
    pub valor_itbi_financiado: f64,
    pub valor_itbi_nao_financiado: f64,
    pub valor_itbi_total: f64,
    pub economia_sfh: f64,
}

/// Body of `POST /itbi/calcular`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CalculoRequest {
    pub sql: String,
    pub valor_transacao: f64,
    pub cidade: Cidade,
}

/// Buyer or seller on a payment slip.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Parte {
    pub nome: String,
    /// CPF or CNPJ
    pub documento: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Parte {
    pub fn new(nome: impl Into<String>, documento: impl Into<String>) -> Self {
        Self {
            nome: nome.into(),
            documento: documento.into(),
            email: None,
        }
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Body of `POST /itbi/guia`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GuiaRequest {
    pub sql: String,
    pub valor_transacao: f64,
    pub comprador: Parte,
    pub vendedor: Parte,
    pub cidade: Cidade,
}

impl GuiaRequest {
    pub fn new(
        sql: impl Into<String>,
        valor_transacao: f64,
        comprador: Parte,
        vendedor: Parte,
    ) -> Self {
        Self {
            sql: sql.into(),
            valor_transacao,
            comprador,
            vendedor,
            cidade: Cidade::default(),
        }
    }

    pub fn cidade(mut self, cidade: impl Into<Cidade>) -> Self {
        self.cidade = cidade.into();
        self
    }
}

/// Body of `POST /itbi/simular`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimulacaoRequest {
    pub valor_transacao: f64,
    pub cidade: Cidade,
    /// `sfh` or `nao_sfh`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tipo_financiamento: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valor_financiado: Option<f64>,
}

impl SimulacaoRequest {
    pub fn new(valor_transacao: f64) -> Self {
        Self {
            valor_transacao,
            cidade: Cidade::default(),
            tipo_financiamento: None,
            valor_financiado: None,
        }
    }

    pub fn cidade(mut self, cidade: impl Into<Cidade>) -> Self {
        self.cidade = cidade.into();
        self
    }

    pub fn financiamento(mut self, tipo: impl Into<String>, valor_financiado: f64) -> Self {
        self.tipo_financiamento = Some(tipo.into());
        self.valor_financiado = Some(valor_financiado);
        self
    }
}
