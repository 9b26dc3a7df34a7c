//! Canonical Schema Module
//! The fixed, ordered column set every yearly export is normalized into.

use polars::prelude::*;

/// How a canonical column is typed during coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// First 4-digit run of the raw text, as Int32.
    Year,
    /// Day-first calendar date.
    Date,
    /// Locale-ambiguous currency text, as Float64.
    Amount,
    /// Upper-case letters only, at most 3 characters.
    StateCode,
    /// Trimmed and upper-cased.
    UpperText,
    /// Trimmed, original case preserved.
    Text,
}

/// One column of the canonical payment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CanonicalColumn {
    AnoReferencia,
    Processo,
    DataInicioProcesso,
    DataTerminoProcesso,
    Beneficiario,
    CpfHash,
    LinhaFomento,
    Modalidade,
    CategoriaNivel,
    NomeChamada,
    ProgramaCnpq,
    GrandeArea,
    Area,
    Subarea,
    InstituicaoOrigem,
    SiglaUfOrigem,
    PaisOrigem,
    InstituicaoDestino,
    SiglaInstituicaoDestino,
    SiglaInstituicaoMacro,
    CidadeDestino,
    SiglaUfDestino,
    RegiaoDestino,
    PaisDestino,
    TituloProjeto,
    PalavraChave,
    Uo,
    NaturezaDespesa,
    ValorPago,
}

impl CanonicalColumn {
    /// All canonical columns in output order.
    pub const ALL: [CanonicalColumn; 29] = [
        CanonicalColumn::AnoReferencia,
        CanonicalColumn::Processo,
        CanonicalColumn::DataInicioProcesso,
        CanonicalColumn::DataTerminoProcesso,
        CanonicalColumn::Beneficiario,
        CanonicalColumn::CpfHash,
        CanonicalColumn::LinhaFomento,
        CanonicalColumn::Modalidade,
        CanonicalColumn::CategoriaNivel,
        CanonicalColumn::NomeChamada,
        CanonicalColumn::ProgramaCnpq,
        CanonicalColumn::GrandeArea,
        CanonicalColumn::Area,
        CanonicalColumn::Subarea,
        CanonicalColumn::InstituicaoOrigem,
        CanonicalColumn::SiglaUfOrigem,
        CanonicalColumn::PaisOrigem,
        CanonicalColumn::InstituicaoDestino,
        CanonicalColumn::SiglaInstituicaoDestino,
        CanonicalColumn::SiglaInstituicaoMacro,
        CanonicalColumn::CidadeDestino,
        CanonicalColumn::SiglaUfDestino,
        CanonicalColumn::RegiaoDestino,
        CanonicalColumn::PaisDestino,
        CanonicalColumn::TituloProjeto,
        CanonicalColumn::PalavraChave,
        CanonicalColumn::Uo,
        CanonicalColumn::NaturezaDespesa,
        CanonicalColumn::ValorPago,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CanonicalColumn::AnoReferencia => "ANO_REFERENCIA",
            CanonicalColumn::Processo => "PROCESSO",
            CanonicalColumn::DataInicioProcesso => "DATA_INICIO_PROCESSO",
            CanonicalColumn::DataTerminoProcesso => "DATA_TERMINO_PROCESSO",
            CanonicalColumn::Beneficiario => "BENEFICIARIO",
            CanonicalColumn::CpfHash => "CPF_HASH",
            CanonicalColumn::LinhaFomento => "LINHA_FOMENTO",
            CanonicalColumn::Modalidade => "MODALIDADE",
            CanonicalColumn::CategoriaNivel => "CATEGORIA_NIVEL",
            CanonicalColumn::NomeChamada => "NOME_CHAMADA",
            CanonicalColumn::ProgramaCnpq => "PROGRAMA_CNPQ",
            CanonicalColumn::GrandeArea => "GRANDE_AREA",
            CanonicalColumn::Area => "AREA",
            CanonicalColumn::Subarea => "SUBAREA",
            CanonicalColumn::InstituicaoOrigem => "INSTITUICAO_ORIGEM",
            CanonicalColumn::SiglaUfOrigem => "SIGLA_UF_ORIGEM",
            CanonicalColumn::PaisOrigem => "PAIS_ORIGEM",
            CanonicalColumn::InstituicaoDestino => "INSTITUICAO_DESTINO",
            CanonicalColumn::SiglaInstituicaoDestino => "SIGLA_INSTITUICAO_DESTINO",
            CanonicalColumn::SiglaInstituicaoMacro => "SIGLA_INSTITUICAO_MACRO",
            CanonicalColumn::CidadeDestino => "CIDADE_DESTINO",
            CanonicalColumn::SiglaUfDestino => "SIGLA_UF_DESTINO",
            CanonicalColumn::RegiaoDestino => "REGIAO_DESTINO",
            CanonicalColumn::PaisDestino => "PAIS_DESTINO",
            CanonicalColumn::TituloProjeto => "TITULO_PROJETO",
            CanonicalColumn::PalavraChave => "PALAVRA_CHAVE",
            CanonicalColumn::Uo => "UO",
            CanonicalColumn::NaturezaDespesa => "NATUREZA_DESPESA",
            CanonicalColumn::ValorPago => "VALOR_PAGO",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            CanonicalColumn::AnoReferencia => FieldKind::Year,
            CanonicalColumn::DataInicioProcesso | CanonicalColumn::DataTerminoProcesso => {
                FieldKind::Date
            }
            CanonicalColumn::ValorPago => FieldKind::Amount,
            CanonicalColumn::SiglaUfOrigem | CanonicalColumn::SiglaUfDestino => {
                FieldKind::StateCode
            }
            // Free text kept readable
            CanonicalColumn::Beneficiario
            | CanonicalColumn::TituloProjeto
            | CanonicalColumn::PalavraChave => FieldKind::Text,
            _ => FieldKind::UpperText,
        }
    }

    /// Physical dtype after coercion.
    pub fn dtype(self) -> DataType {
        match self.kind() {
            FieldKind::Year => DataType::Int32,
            FieldKind::Date => DataType::Date,
            FieldKind::Amount => DataType::Float64,
            _ => DataType::String,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.name() == name)
    }
}

/// Canonical column names in output order.
pub fn canonical_names() -> Vec<&'static str> {
    CanonicalColumn::ALL.iter().map(|c| c.name()).collect()
}

pub const YEAR_COL: &str = "ANO_REFERENCIA";
pub const PROCESS_COL: &str = "PROCESSO";
pub const BENEFICIARY_COL: &str = "BENEFICIARIO";
pub const CATEGORY_COL: &str = "MODALIDADE";
pub const AMOUNT_COL: &str = "VALOR_PAGO";
pub const REGION_COL: &str = "REGIAO_DESTINO";
pub const UF_ORIGIN_COL: &str = "SIGLA_UF_ORIGEM";
pub const UF_DEST_COL: &str = "SIGLA_UF_DESTINO";
