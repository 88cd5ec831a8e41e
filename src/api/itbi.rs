//! ITBI endpoints.

use crate::client::{ApiRequest, Client, Result};
use crate::types::{
    CalculoRequest, Cidade, GuiaRequest, ItbiAliquota, ItbiCalculo, ItbiGuia, ItbiHistorico,
    ItbiIsencao, ItbiSimulacao, ItbiStatus, ItbiValidacao, SimulacaoRequest,
};

impl Client {
    pub async fn itbi_status(
        &self,
        protocolo: &str,
        cidade: impl Into<Cidade>,
    ) -> Result<ItbiStatus> {
        let request = ApiRequest::get("/itbi/status")
            .query("protocolo", protocolo)
            .query("cidade", cidade.into());
        self.fetch_one(request).await
    }

    pub async fn itbi_calcular(
        &self,
        sql: &str,
        valor_transacao: f64,
        cidade: impl Into<Cidade>,
    ) -> Result<ItbiCalculo> {
        let body = CalculoRequest {
            sql: sql.to_string(),
            valor_transacao,
            cidade: cidade.into(),
        };
        let request = ApiRequest::post("/itbi/calcular").json(&body)?;
        self.fetch_one(request).await
    }

    /// Past transactions of a property. Requires a Starter plan.
    pub async fn itbi_historico(
        &self,
        sql: &str,
        cidade: impl Into<Cidade>,
    ) -> Result<Vec<ItbiHistorico>> {
        let request = ApiRequest::get("/itbi/historico")
            .query("sql", sql)
            .query("cidade", cidade.into());
        self.fetch_list(request).await
    }

    pub async fn itbi_aliquotas(&self, cidade: impl Into<Cidade>) -> Result<ItbiAliquota> {
        let request = ApiRequest::get("/itbi/aliquotas").query("cidade", cidade.into());
        self.fetch_one(request).await
    }

    pub async fn itbi_isencoes(&self, cidade: impl Into<Cidade>) -> Result<Vec<ItbiIsencao>> {
        let request = ApiRequest::get("/itbi/isencoes").query("cidade", cidade.into());
        self.fetch_list(request).await
    }

    /// Issues a payment slip. Requires a Starter plan.
    pub async fn itbi_guia(&self, guia: &GuiaRequest) -> Result<ItbiGuia> {
        let request = ApiRequest::post("/itbi/guia").json(guia)?;
        self.fetch_one(request).await
    }

    pub async fn itbi_validar_guia(
        &self,
        protocolo: &str,
        cidade: impl Into<Cidade>,
    ) -> Result<ItbiValidacao> {
        let request = ApiRequest::get("/itbi/validar")
            .query("protocolo", protocolo)
            .query("cidade", cidade.into());
        self.fetch_one(request).await
    }

    pub async fn itbi_simular(&self, simulacao: &SimulacaoRequest) -> Result<ItbiSimulacao> {
        let request = ApiRequest::post("/itbi/simular").json(simulacao)?;
        self.fetch_one(request).await
    }
}
