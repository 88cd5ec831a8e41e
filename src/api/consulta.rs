//! Property lookups.

use crate::client::{ApiRequest, Client, Result};
use crate::types::{Cidade, Imovel, Zoneamento};

impl Client {
    /// Properties at a street address.
    pub async fn consulta_endereco(
        &self,
        logradouro: &str,
        numero: &str,
        cidade: impl Into<Cidade>,
    ) -> Result<Vec<Imovel>> {
        let request = ApiRequest::get("/consulta/endereco")
            .query("logradouro", logradouro)
            .query("numero", numero)
            .query("cidade", cidade.into());
        self.fetch_list(request).await
    }

    /// Properties by cadastral identifier (SQL / indice cadastral).
    pub async fn consulta_sql(&self, sql: &str, cidade: impl Into<Cidade>) -> Result<Vec<Imovel>> {
        let request = ApiRequest::get("/consulta/sql")
            .query("sql", sql)
            .query("cidade", cidade.into());
        self.fetch_list(request).await
    }

    pub async fn consulta_cep(&self, cep: &str, cidade: impl Into<Cidade>) -> Result<Vec<Imovel>> {
        let request = ApiRequest::get("/consulta/cep")
            .query("cep", cep)
            .query("cidade", cidade.into());
        self.fetch_list(request).await
    }

    /// Zoning rules at a coordinate.
    pub async fn consulta_zoneamento(&self, latitude: f64, longitude: f64) -> Result<Zoneamento> {
        let request = ApiRequest::get("/consulta/zoneamento")
            .query("lat", latitude)
            .query("lng", longitude);
        self.fetch_one(request).await
    }
}
