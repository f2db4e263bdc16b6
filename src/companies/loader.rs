use std::fs::File;
use std::io::{BufRead, BufReader};
use serde::{Deserialize, Serialize};
use log::{info, warn};

/// One row of the company reference list. Immutable after load; the ladder
/// owns every instance for the process lifetime.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Company {
    pub name: String,
    pub symbol: String,
    pub marketcap: f64,
}

impl Company {
    pub fn from_csv_line(line: &str, line_num: usize) -> Result<Self, String> {
        let fields: Vec<&str> = line.split(',').collect();

        if fields.len() != 3 {
            return Err(format!(
                "Invalid CSV format at line {}: expected 3 fields, got {}",
                line_num + 1,
                fields.len()
            ));
        }

        let name = fields[0].trim();
        let symbol = fields[1].trim();

        if name.is_empty() {
            return Err(format!("Missing company name at line {}", line_num + 1));
        }

        if symbol.is_empty() {
            return Err(format!("Missing ticker symbol at line {}", line_num + 1));
        }

        let marketcap: f64 = fields[2]
            .trim()
            .parse()
            .map_err(|e| format!("Invalid market cap at line {}: {}", line_num + 1, e))?;

        if !marketcap.is_finite() || marketcap < 0.0 {
            return Err(format!(
                "Market cap must be a non-negative number at line {}: got {}",
                line_num + 1,
                fields[2].trim()
            ));
        }

        Ok(Company {
            name: name.to_string(),
            symbol: symbol.to_string(),
            marketcap,
        })
    }
}

fn is_header_row(line: &str) -> bool {
    let fields: Vec<&str> = line.split(',').collect();
    fields.len() == 3 && fields[2].trim().eq_ignore_ascii_case("marketcap")
}

pub struct CompanyLoader;

impl CompanyLoader {
    /// Loads company rows from a delimited file. Rows that fail validation
    /// are skipped with a warning; only an unreadable source is an error.
    /// An empty-but-readable file yields an empty list.
    pub fn load_from_csv(file_path: &str) -> Result<Vec<Company>, Box<dyn std::error::Error>> {
        let file = File::open(file_path)
            .map_err(|e| format!("Failed to open file {}: {}", file_path, e))?;

        let reader = BufReader::new(file);
        let mut companies: Vec<Company> = Vec::new();
        let mut skipped = 0usize;

        for (line_num, line_result) in reader.lines().enumerate() {
            let line = line_result?;

            // Skip empty lines
            if line.trim().is_empty() {
                continue;
            }

            if line_num == 0 && is_header_row(&line) {
                continue;
            }

            match Company::from_csv_line(&line, line_num) {
                Ok(company) => companies.push(company),
                Err(e) => {
                    warn!("Skipping invalid company row: {}", e);
                    skipped += 1;
                    // Continue processing other lines
                }
            }
        }

        if skipped > 0 {
            warn!(
                "Loaded {} companies from {} with {} rows skipped",
                companies.len(),
                file_path,
                skipped
            );
        } else {
            info!("Loaded {} companies from {}", companies.len(), file_path);
        }

        Ok(companies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_company_from_csv_line() {
        let result = Company::from_csv_line("Apple Inc.,AAPL,3400000000000", 1);

        assert!(result.is_ok());
        let company = result.unwrap();
        assert_eq!(company.name, "Apple Inc.");
        assert_eq!(company.symbol, "AAPL");
        assert_eq!(company.marketcap, 3_400_000_000_000.0);
    }

    #[test]
    fn test_company_missing_fields() {
        let result = Company::from_csv_line("Apple Inc.,AAPL", 0);

        assert!(result.is_err());
        assert!(result.unwrap_err().contains("expected 3 fields"));
    }

    #[test]
    fn test_company_rejects_bad_market_cap() {
        assert!(Company::from_csv_line("Acme,ACME,not-a-number", 0).is_err());
        assert!(Company::from_csv_line("Acme,ACME,-100", 0).is_err());
        assert!(Company::from_csv_line("Acme,ACME,NaN", 0).is_err());
        assert!(Company::from_csv_line("Acme,ACME,inf", 0).is_err());
    }

    #[test]
    fn test_company_rejects_empty_name_or_symbol() {
        assert!(Company::from_csv_line(",ACME,100", 0).is_err());
        assert!(Company::from_csv_line("Acme,,100", 0).is_err());
    }

    #[test]
    fn test_zero_market_cap_is_valid() {
        let company = Company::from_csv_line("Shell Co,SHL,0", 0).unwrap();
        assert_eq!(company.marketcap, 0.0);
    }

    #[test]
    fn test_header_row_detection() {
        assert!(is_header_row("Name,Symbol,marketcap"));
        assert!(is_header_row("name,symbol,MarketCap"));
        assert!(!is_header_row("Apple Inc.,AAPL,3400000000000"));
    }

    #[test]
    fn test_load_skips_invalid_rows() {
        let path = std::env::temp_dir().join(format!("companies_{}.csv", std::process::id()));
        std::fs::write(
            &path,
            "Name,Symbol,marketcap\n\
             Microsoft,MSFT,3100000000000\n\
             Broken Row,BRK\n\
             Apple Inc.,AAPL,3400000000000\n\
             Negative,NEG,-5\n\
             \n\
             Walmart,WMT,810000000000\n",
        )
        .unwrap();

        let companies = CompanyLoader::load_from_csv(path.to_str().unwrap()).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(companies.len(), 3);
        assert_eq!(companies[0].symbol, "MSFT");
        assert_eq!(companies[1].symbol, "AAPL");
        assert_eq!(companies[2].symbol, "WMT");
    }

    #[test]
    fn test_load_empty_file_is_not_an_error() {
        let path = std::env::temp_dir().join(format!("companies_empty_{}.csv", std::process::id()));
        std::fs::write(&path, "").unwrap();

        let companies = CompanyLoader::load_from_csv(path.to_str().unwrap()).unwrap();
        std::fs::remove_file(&path).ok();

        assert!(companies.is_empty());
    }

    #[test]
    fn test_load_unreadable_file_is_an_error() {
        assert!(CompanyLoader::load_from_csv("./no-such-dir/companies.csv").is_err());
    }
}
