//! Deterministic synthetic fallback data
//!
//! When every live endpoint of a source is exhausted the pipeline degrades
//! to a small schema-representative sample instead of halting. The samples
//! are fixed values (no randomness): identical runs produce identical
//! artifacts, and the shared business keys (`codigo_ug` / `uasg` /
//! `codigo_siafi`) line up across sources so downstream integration stays
//! exercisable.

use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::Result;
use govhub_common::types::{Record, Table};

/// Build the synthetic sample table for a source.
///
/// Known sources get their production-like schemas; anything else gets a
/// generic tabular placeholder so the degraded path always yields rows.
pub fn sample_table(source: &str) -> Table {
    match source {
        "siafi" => table_from(
            &[
                "codigo_ug",
                "orgao",
                "gestao",
                "numero_empenho",
                "valor_empenhado",
                "credor",
                "data_empenho",
                "funcao",
            ],
            &[
                &["153978", "26291", "15256", "2025NE000123", "150000.00", "12345678000123", "2025-01-15", "Administração"],
                &["153979", "26291", "15256", "2025NE000124", "75000.50", "98765432000876", "2025-02-20", "Educação"],
                &["154357", "26291", "15256", "2025NE000125", "200000.00", "45678901000567", "2025-03-10", "Saúde"],
                &["154358", "36000", "15256", "2025NE000126", "95000.75", "32109876000210", "2025-04-05", "Segurança"],
                &["154359", "36000", "15256", "2025NE000127", "180000.25", "78901234000890", "2025-05-12", "Transporte"],
            ],
        ),
        "compras" => table_from(
            &[
                "uasg",
                "id_contrato",
                "valor_total",
                "cnpj_contratada",
                "objeto_contrato",
                "data_assinatura",
                "modalidade",
            ],
            &[
                &["153978", "2025/001", "150000.00", "12345678000123", "Serviços de TI", "2025-01-15", "Pregão Eletrônico"],
                &["153979", "2025/002", "75000.50", "98765432000876", "Manutenção Predial", "2025-02-20", "Concorrência"],
                &["154357", "2025/003", "200000.00", "45678901000567", "Consultoria", "2025-03-10", "Tomada de Preços"],
                &["154358", "2025/004", "95000.75", "32109876000210", "Material de Escritório", "2025-04-05", "Pregão Eletrônico"],
                &["154359", "2025/005", "180000.25", "78901234000890", "Equipamentos", "2025-05-12", "Dispensa"],
            ],
        ),
        "transferegov" => table_from(
            &[
                "codigo_siafi",
                "convenio",
                "valor_liberado",
                "data_liberacao",
                "beneficiario",
                "uf",
                "programa",
            ],
            &[
                &["153978", "123456", "150000.00", "2025-01-15", "Município de São Paulo", "SP", "Educação Básica"],
                &["153979", "123457", "75000.50", "2025-02-20", "Município do Rio de Janeiro", "RJ", "Saúde da Família"],
                &["154357", "123458", "200000.00", "2025-03-10", "Município de Brasília", "DF", "Infraestrutura"],
                &["154358", "123459", "95000.75", "2025-04-05", "Município de Salvador", "BA", "Assistência Social"],
                &["154359", "123460", "180000.25", "2025-05-12", "Município de Fortaleza", "CE", "Meio Ambiente"],
            ],
        ),
        other => {
            warn!(source = other, "no dedicated sample schema, using generic placeholder");
            table_from(
                &["codigo_ug", "registro", "valor", "data_referencia"],
                &[
                    &["153978", "REG-0001", "150000.00", "2025-01-15"],
                    &["153979", "REG-0002", "75000.50", "2025-02-20"],
                    &["154357", "REG-0003", "200000.00", "2025-03-10"],
                    &["154358", "REG-0004", "95000.75", "2025-04-05"],
                    &["154359", "REG-0005", "180000.25", "2025-05-12"],
                ],
            )
        },
    }
}

/// Write the sample artifact for `source` into the raw-data directory.
///
/// The filename marks the artifact as synthetic:
/// `{source}_amostra_{YYYY-MM-DD}.csv`.
pub fn write_sample(source: &str, raw_dir: &Path) -> Result<PathBuf> {
    let table = sample_table(source);
    let stamp = Local::now().format("%Y-%m-%d");
    let path = raw_dir.join(format!("{}_amostra_{}.csv", source, stamp));

    table.write_csv(&path)?;
    info!(
        source,
        records = table.len(),
        path = %path.display(),
        "synthetic sample written"
    );
    Ok(path)
}

fn table_from(columns: &[&str], rows: &[&[&str]]) -> Table {
    let mut table = Table::with_columns(columns.iter().map(|c| c.to_string()).collect());
    for row in rows {
        let record: Record = columns.iter().copied().zip(row.iter().copied()).collect();
        table.push_row(record);
    }
    table
}

// ============================================================================
// Tests
// ============================================================================
