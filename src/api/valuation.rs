//! Market valuation endpoints. Most require a Pro plan; callers without one
//! get [`Error::Forbidden`](crate::Error::Forbidden).

use crate::client::{ApiRequest, Client, Result};
use crate::types::{
    Cidade, ComparablesRequest, Comparavel, EstimateRequest, PropertyEvaluation, Valuation,
};

impl Client {
    pub async fn valuation_estimate(&self, params: &EstimateRequest) -> Result<Valuation> {
        let request = ApiRequest::get("/valuation/estimate")
            .query("area_terreno", params.area_terreno)
            .query("area_construida", params.area_construida)
            .query("bairro", &params.bairro)
            .query("cidade", &params.cidade)
            .query_opt("zona", params.zona.as_ref())
            .query_opt("tipo_uso", params.tipo_uso.as_ref())
            .query_opt("tipo_padrao", params.tipo_padrao.as_ref())
            .query_opt("ano_construcao", params.ano_construcao);
        self.fetch_one(request).await
    }

    pub async fn valuation_comparables(
        &self,
        params: &ComparablesRequest,
    ) -> Result<Vec<Comparavel>> {
        let request = ApiRequest::get("/valuation/comparables")
            .query("bairro", &params.bairro)
            .query("area_min", params.area_min)
            .query("area_max", params.area_max)
            .query("cidade", &params.cidade)
            .query("limit", params.limit);
        self.fetch_list(request).await
    }

    /// Combined IPTU, AVM and ITBI evaluation of one property.
    pub async fn valuation_evaluate(
        &self,
        sql: &str,
        cidade: impl Into<Cidade>,
    ) -> Result<PropertyEvaluation> {
        let request = ApiRequest::get("/valuation/evaluate")
            .query("sql", sql)
            .query("cidade", cidade.into());
        self.fetch_one(request).await
    }
}
