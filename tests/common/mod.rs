#![allow(dead_code)]

use cnpq_payments::AppConfig;
use std::fs;
use std::path::Path;

pub const FILE_2022: &str = "Relatorio_Pagamentos_2022.csv";
pub const FILE_2023: &str = "dados-de-pagamento-2023-pda.csv";
pub const FILE_2024: &str = "pagamentos_20250204.csv";

const RAW_2022: &str = "\
Relatório de Pagamentos de Bolsas
Gerado em 04/02/2025
Fonte: CNPq
Valores em reais
Unidade orçamentária 20501

Ano Referência;Processo;Beneficiário;Modalidade;Grande Área;Sigla UF Destino;Região Destino;UO;Valor Pago
2022;200/2022;Ana Souza;gd;Exatas;sp;Sudeste;20501;R$ 1.200,50
2022;100/2022;João Lima;pq;Humanas;rj ;Sudeste;20501;R$ 300,00
;;;;;;;;
;;Sem Ano;gd;Exatas;sp;Sudeste;20501;10,00
";

const RAW_2023: &str = "\
Dados de pagamento 2023
Plano de Dados Abertos
Conselho Nacional de Desenvolvimento Cientifico e Tecnologico
Periodo: janeiro a dezembro
Atualizado em: 2024
Observacao: valores brutos
Fonte: CNPq

ANO_REFERENCIA,PROCESSO,BENEFICIARIO,NU_CPF,MODALIDADE,GRANDE_AREA,SIGLA_UF_DESTINO,REGIAO,VALOR_PAGO
2023,300/2023,Carla Dias,***123***,GD,Exatas,MG,Sudeste,\"$ 8,100.00\"
Ano 2023 (parcial),050/2023,Davi Reis,***456***,PQ,Humanas,BA,Nordeste,\"600,00\"
";

const RAW_2024: &str = "\
ANO_REFERENCIA;PROCESSO;BENEFICIARIO;CPF ANONIMIZADO;MODALIDADE;GRANDE_AREA;SIGLA_UF_DESTINO;REGIAO;VALOR_PAGO;DATA_INICIO_PROCESSO
2024;400/2024;Eva Melo;***789***;GD;Exatas;SP;Sudeste;300.0;01/03/2024
";

/// ISO-8859-1 bytes of a string made only of code points below 256.
pub fn latin1(text: &str) -> Vec<u8> {
    text.chars().map(|c| c as u32 as u8).collect()
}

/// Lay out the three raw exports under `<root>/data/raw`.
pub fn write_raw_exports(root: &Path) {
    let raw = root.join("data/raw");
    fs::create_dir_all(&raw).unwrap();
    fs::write(raw.join(FILE_2022), latin1(RAW_2022)).unwrap();
    fs::write(raw.join(FILE_2023), RAW_2023).unwrap();
    fs::write(raw.join(FILE_2024), RAW_2024).unwrap();
}

pub fn config_for(root: &Path) -> AppConfig {
    AppConfig::load(root).unwrap()
}
