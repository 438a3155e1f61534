use anyhow::{anyhow, Result};
use serde_json::{json, Value};

use super::Tool;

pub const TOOL_NAME: &str = "convert_currency";
pub const AMOUNT_PARAM: &str = "amount";
pub const RATE_PARAM: &str = "conversion_rate";

/// Multiply an amount by a conversion rate. No bounds check on the amount;
/// rejecting negatives is the front end's concern.
pub fn convert(amount: f64, rate: f64) -> f64 {
    amount * rate
}

/// The arithmetic conversion tool. The rate parameter is optional at the wire
/// level: when the model omits it, the agent injects the last rate it saw.
pub fn tool() -> Tool {
    Tool::new(
        TOOL_NAME,
        "Convert an amount of the base currency into the target currency \
         using a conversion rate.",
        json!({
            "type": "object",
            "properties": {
                (AMOUNT_PARAM): {
                    "type": "number",
                    "description": "The amount of the base currency to convert"
                },
                (RATE_PARAM): {
                    "type": "number",
                    "description": "The conversion rate from base to target currency"
                }
            },
            "required": [AMOUNT_PARAM]
        }),
        run,
    )
}

fn run(params: &Value) -> Result<Value> {
    let amount = number_param(params, AMOUNT_PARAM)?;
    let rate = number_param(params, RATE_PARAM)?;
    Ok(json!(convert(amount, rate)))
}

fn number_param(params: &Value, name: &str) -> Result<f64> {
    params
        .get(name)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| anyhow!("Missing or non-numeric parameter: {}", name))
}
