//! Column Mapper Module
//! Per-year read parameters and rename tables onto the canonical schema.

use super::schema::CanonicalColumn;
use polars::prelude::*;
use std::collections::HashMap;
use std::fmt;

use CanonicalColumn as C;

/// One of the three known yearly export layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceYear {
    Y2022,
    Y2023,
    Y2024,
}

/// Layout quirks needed to read a raw export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadParams {
    /// 0-based line index of the header row.
    pub header_row: usize,
    /// Fixed delimiter, or `None` to sniff it from the header line.
    pub delimiter: Option<u8>,
}

const MAP_2022: &[(&str, CanonicalColumn)] = &[
    ("Ano Referência", C::AnoReferencia),
    ("Processo", C::Processo),
    ("Data Início Processo", C::DataInicioProcesso),
    ("Data Término Processo", C::DataTerminoProcesso),
    ("Beneficiário", C::Beneficiario),
    ("Linha de Fomento", C::LinhaFomento),
    ("Modalidade", C::Modalidade),
    ("Categoria/Nível", C::CategoriaNivel),
    ("Nome Chamada", C::NomeChamada),
    ("Programa CNPq", C::ProgramaCnpq),
    ("Grande Área", C::GrandeArea),
    ("Área", C::Area),
    ("Subárea", C::Subarea),
    ("Instituição Origem", C::InstituicaoOrigem),
    ("Sigla UF Origem", C::SiglaUfOrigem),
    ("País Origem", C::PaisOrigem),
    ("Instituição Destino", C::InstituicaoDestino),
    ("Sigla Instituição Destino", C::SiglaInstituicaoDestino),
    ("Sigla Instituição Macro", C::SiglaInstituicaoMacro),
    ("Cidade Destino", C::CidadeDestino),
    ("Sigla UF Destino", C::SiglaUfDestino),
    ("Região Destino", C::RegiaoDestino),
    ("País Destino", C::PaisDestino),
    ("Título do Projeto", C::TituloProjeto),
    ("Palavra Chave", C::PalavraChave),
    ("UO", C::Uo),
    ("Natureza de Despesa", C::NaturezaDespesa),
    ("Valor Pago", C::ValorPago),
];

const MAP_2023: &[(&str, CanonicalColumn)] = &[
    ("ANO_REFERENCIA", C::AnoReferencia),
    ("PROCESSO", C::Processo),
    ("DATA_INICIO_PROCESSO", C::DataInicioProcesso),
    ("DATA_TERMINO_PROCESSO", C::DataTerminoProcesso),
    ("BENEFICIARIO", C::Beneficiario),
    ("NU_CPF", C::CpfHash),
    ("LINHA_FOMENTO", C::LinhaFomento),
    ("MODALIDADE", C::Modalidade),
    ("CATEGORIA_NIVEL", C::CategoriaNivel),
    ("NOME_CHAMADA", C::NomeChamada),
    ("PROGRAMA_CNPQ", C::ProgramaCnpq),
    ("GRANDE_AREA", C::GrandeArea),
    ("AREA", C::Area),
    ("SUBAREA", C::Subarea),
    ("INSTITUICAO_ORIGEM", C::InstituicaoOrigem),
    ("SIGLA_UF_ORIGEM", C::SiglaUfOrigem),
    ("PAIS_ORIGEM", C::PaisOrigem),
    ("INSTITUICAO_DESTINO", C::InstituicaoDestino),
    ("SIGLA_INSTITUICAO_DESTINO", C::SiglaInstituicaoDestino),
    ("SIGLA_INSTITUICAO_MACRO", C::SiglaInstituicaoMacro),
    ("CIDADE_DESTINO", C::CidadeDestino),
    ("SIGLA_UF_DESTINO", C::SiglaUfDestino),
    ("REGIAO", C::RegiaoDestino),
    ("PAIS_DESTINO", C::PaisDestino),
    ("TITULO_PROJETO", C::TituloProjeto),
    ("PALAVRA_CHAVE", C::PalavraChave),
    ("VALOR_PAGO", C::ValorPago),
];

const MAP_2024: &[(&str, CanonicalColumn)] = &[
    ("ANO_REFERENCIA", C::AnoReferencia),
    ("PROCESSO", C::Processo),
    ("DATA_INICIO_PROCESSO", C::DataInicioProcesso),
    ("DATA_TERMINO_PROCESSO", C::DataTerminoProcesso),
    ("BENEFICIARIO", C::Beneficiario),
    ("CPF ANONIMIZADO", C::CpfHash),
    ("LINHA_FOMENTO", C::LinhaFomento),
    ("MODALIDADE", C::Modalidade),
    ("CATEGORIA_NIVEL", C::CategoriaNivel),
    ("NOME_CHAMADA", C::NomeChamada),
    ("PROGRAMA_CNPQ", C::ProgramaCnpq),
    ("GRANDE_AREA", C::GrandeArea),
    ("AREA", C::Area),
    ("SUBAREA", C::Subarea),
    ("INSTITUICAO_ORIGEM", C::InstituicaoOrigem),
    ("SIGLA_UF_ORIGEM", C::SiglaUfOrigem),
    ("PAIS_ORIGEM", C::PaisOrigem),
    ("INSTITUICAO_DESTINO", C::InstituicaoDestino),
    ("SIGLA_INSTITUICAO_DESTINO", C::SiglaInstituicaoDestino),
    ("SIGLA_INSTITUICAO_MACRO", C::SiglaInstituicaoMacro),
    ("CIDADE_DESTINO", C::CidadeDestino),
    ("SIGLA_UF_DESTINO", C::SiglaUfDestino),
    ("REGIAO", C::RegiaoDestino),
    ("PAIS_DESTINO", C::PaisDestino),
    ("TITULO_PROJETO", C::TituloProjeto),
    ("PALAVRA_CHAVE", C::PalavraChave),
    ("VALOR_PAGO", C::ValorPago),
];

impl SourceYear {
    /// Source years in concatenation order.
    pub const ALL: [SourceYear; 3] = [SourceYear::Y2022, SourceYear::Y2023, SourceYear::Y2024];

    pub fn year(self) -> i32 {
        match self {
            SourceYear::Y2022 => 2022,
            SourceYear::Y2023 => 2023,
            SourceYear::Y2024 => 2024,
        }
    }

    pub fn read_params(self) -> ReadParams {
        match self {
            SourceYear::Y2022 => ReadParams {
                header_row: 5,
                delimiter: None,
            },
            SourceYear::Y2023 => ReadParams {
                header_row: 7,
                delimiter: None,
            },
            SourceYear::Y2024 => ReadParams {
                header_row: 0,
                delimiter: Some(b';'),
            },
        }
    }

    /// Raw header -> canonical column.
    pub fn rename_table(self) -> &'static [(&'static str, CanonicalColumn)] {
        match self {
            SourceYear::Y2022 => MAP_2022,
            SourceYear::Y2023 => MAP_2023,
            SourceYear::Y2024 => MAP_2024,
        }
    }

    /// Lower-case file name fragment identifying this year's export.
    pub fn file_marker(self) -> &'static str {
        match self {
            SourceYear::Y2022 => "relatorio",
            SourceYear::Y2023 => "dados-de-pagamento-2023-pda",
            SourceYear::Y2024 => "20250204",
        }
    }
}

impl fmt::Display for SourceYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.year())
    }
}

/// Align a raw frame to the canonical schema.
///
/// Header whitespace and a stray byte-order mark are trimmed before lookup.
/// Unmapped raw columns are dropped; canonical columns with no source become
/// all-null String columns.
pub fn map_columns(
    df: &DataFrame,
    table: &[(&str, CanonicalColumn)],
) -> PolarsResult<DataFrame> {
    let lookup: HashMap<&str, CanonicalColumn> = table.iter().copied().collect();

    let mut sources: HashMap<CanonicalColumn, &Column> = HashMap::new();
    for column in df.get_columns() {
        let header = column
            .name()
            .trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}');
        let target = lookup
            .get(header)
            .copied()
            .or_else(|| CanonicalColumn::from_name(header));
        if let Some(target) = target {
            // First occurrence wins on duplicate headers
            sources.entry(target).or_insert(column);
        }
    }

    let height = df.height();
    let columns = CanonicalColumn::ALL
        .iter()
        .map(|canonical| match sources.get(canonical) {
            Some(source) => {
                let mut mapped = (*source).clone();
                mapped.rename(canonical.name().into());
                mapped
            }
            None => Column::full_null(canonical.name().into(), height, &DataType::String),
        })
        .collect::<Vec<_>>();

    DataFrame::new(columns)
}
