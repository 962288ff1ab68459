//! Price histories and return statistics

use chrono::NaiveDate;
use ndarray::{Array1, Array2, Axis};
use std::fs::File;
use std::path::Path;

use crate::error::{Error, Result};

/// Chronologically ordered prices of one coin
#[derive(Debug, Clone, PartialEq)]
pub struct PriceHistory {
    pub coin: String,
    pub prices: Vec<f64>,
}

impl PriceHistory {
    pub fn new(coin: &str, prices: Vec<f64>) -> Self {
        Self {
            coin: coin.to_string(),
            prices,
        }
    }

    /// Load `date` and `price` columns; rows are sorted by date, other columns ignored
    pub fn load_csv<P: AsRef<Path>>(path: P, coin: &str) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::from_io(e, path))?;
        let mut reader = csv::Reader::from_reader(file);

        let headers = reader.headers()?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| {
                    Error::ParseError(format!("{}: missing '{}' column", path.display(), name))
                })
        };
        let date_col = column("date")?;
        let price_col = column("price")?;

        let mut rows: Vec<(NaiveDate, f64)> = Vec::new();
        for (row_idx, result) in reader.records().enumerate() {
            let record = result?;
            let field = |col: usize| record.get(col).map(str::trim).unwrap_or("");

            let date = NaiveDate::parse_from_str(field(date_col), "%Y-%m-%d").map_err(|e| {
                Error::ParseError(format!("{}: row {}: {}", path.display(), row_idx, e))
            })?;
            let price = field(price_col).parse::<f64>().map_err(|_| {
                Error::ParseError(format!(
                    "{}: row {} has non-numeric price '{}'",
                    path.display(),
                    row_idx,
                    field(price_col)
                ))
            })?;
            rows.push((date, price));
        }

        rows.sort_by_key(|(date, _)| *date);
        Ok(Self::new(coin, rows.into_iter().map(|(_, p)| p).collect()))
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// The most recent `n` prices (all of them if fewer)
    pub fn last(&self, n: usize) -> &[f64] {
        &self.prices[self.prices.len().saturating_sub(n)..]
    }
}

/// Load `<raw_dir>/<coin>_historical_data_raw.csv` for every coin
pub fn load_histories(raw_dir: &Path, coins: &[String]) -> Result<Vec<PriceHistory>> {
    coins
        .iter()
        .map(|coin| {
            PriceHistory::load_csv(raw_dir.join(format!("{}_historical_data_raw.csv", coin)), coin)
        })
        .collect()
}

/// Simple period returns `p[t] / p[t-1] - 1`
pub fn simple_returns(prices: &[f64]) -> Result<Array1<f64>> {
    if let Some(p) = prices.iter().find(|p| **p <= 0.0 || !p.is_finite()) {
        return Err(Error::ParseError(format!("invalid price {}", p)));
    }
    Ok(prices.windows(2).map(|w| w[1] / w[0] - 1.0).collect())
}

/// Per-period mean returns and sample covariance across coins
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStatistics {
    pub coins: Vec<String>,
    pub mean: Array1<f64>,
    pub covariance: Array2<f64>,
}

impl ReturnStatistics {
    /// `returns` has one row per period and one column per coin
    pub fn from_returns(coins: Vec<String>, returns: &Array2<f64>) -> Result<Self> {
        let n = returns.nrows();
        if n < 2 {
            return Err(Error::InsufficientData(format!(
                "{} return periods; at least 2 are needed for a covariance",
                n
            )));
        }
        if coins.len() != returns.ncols() {
            return Err(Error::ShapeMismatch(format!(
                "{} coins for {} return columns",
                coins.len(),
                returns.ncols()
            )));
        }

        let mean = returns
            .mean_axis(Axis(0))
            .ok_or_else(|| Error::InsufficientData("no return periods".to_string()))?;
        let centered = returns - &mean;
        let covariance = centered.t().dot(&centered) / (n - 1) as f64;

        Ok(Self {
            coins,
            mean,
            covariance,
        })
    }

    /// Align every history to its last `interval` prices and compute statistics.
    /// Histories of different length are truncated to the shortest.
    pub fn from_histories(histories: &[PriceHistory], interval: usize) -> Result<Self> {
        if histories.is_empty() {
            return Err(Error::InsufficientData("no coins given".to_string()));
        }

        let length = histories
            .iter()
            .map(|h| h.last(interval).len())
            .min()
            .unwrap_or(0);
        if length < 3 {
            return Err(Error::InsufficientData(format!(
                "only {} aligned prices; at least 3 are needed",
                length
            )));
        }

        let mut returns = Array2::zeros((length - 1, histories.len()));
        for (j, history) in histories.iter().enumerate() {
            let r = simple_returns(history.last(length))?;
            returns.column_mut(j).assign(&r);
        }

        let coins = histories.iter().map(|h| h.coin.clone()).collect();
        Self::from_returns(coins, &returns)
    }

    pub fn n_assets(&self) -> usize {
        self.mean.len()
    }
}

/// Annualized (return, volatility) of a weight vector
pub fn portfolio_performance(
    weights: &Array1<f64>,
    stats: &ReturnStatistics,
    interval: usize,
) -> (f64, f64) {
    let periods = interval as f64;
    let expected_return = weights.dot(&stats.mean) * periods;
    let variance = weights.dot(&stats.covariance.dot(weights)).max(0.0);
    (expected_return, variance.sqrt() * periods.sqrt())
}
