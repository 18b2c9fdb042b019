//! Prompt templates, one per estimation target.

use super::{EstimationTarget, MetricKind};

/// Render the prompt for `target` and `product_name`.
///
/// Pure and deterministic. The caller must have rejected empty names.
pub fn build_prompt(target: EstimationTarget, product_name: &str) -> String {
    match target {
        EstimationTarget::Product => product_prompt(product_name),
        EstimationTarget::Metric(MetricKind::Cpa) => cpa_prompt(product_name),
        EstimationTarget::Metric(MetricKind::Ltv) => ltv_prompt(product_name),
        EstimationTarget::Metric(MetricKind::Cac) => cac_prompt(product_name),
        EstimationTarget::Metric(MetricKind::BreakEven) => break_even_prompt(product_name),
    }
}

const JSON_ONLY: &str = "Respond with ONLY a JSON object in this format (no explanation, no extra text):";
const PLAIN_NUMBERS: &str = "- Return every value as a plain number (no thousands separators, no units)";

fn product_prompt(product_name: &str) -> String {
    format!(
        r#"You are an e-commerce marketing expert. Estimate the following figures for the given product.

Product name: {product_name}

{JSON_ONLY}
{{
  "price": selling price (KRW, number only),
  "profitPerUnit": net profit per unit (KRW, number only),
  "adCost": expected advertising spend (KRW, number only),
  "conversions": expected conversions (number only)
}}

Guidelines:
- Estimate a realistic selling price based on the market
- Net profit per unit is roughly 20-40% of the selling price
- Advertising spend is roughly 5-15% of the selling price
- Conversions are a realistic monthly figure (between 10 and 1000)
{PLAIN_NUMBERS}"#
    )
}

fn cpa_prompt(product_name: &str) -> String {
    format!(
        r#"You are an e-commerce marketing expert. Estimate the inputs needed to calculate a target CPA for the given product.

Product name: {product_name}

{JSON_ONLY}
{{
  "sellingPrice": selling price (KRW, number only),
  "cost": unit cost (KRW, number only)
}}

Guidelines:
- Estimate a realistic selling price based on the market
- Unit cost is roughly 50-70% of the selling price (a typical margin)
{PLAIN_NUMBERS}"#
    )
}

fn ltv_prompt(product_name: &str) -> String {
    format!(
        r#"You are an e-commerce marketing expert. Estimate the inputs needed to calculate customer lifetime value (LTV) for the given product.

Product name: {product_name}

{JSON_ONLY}
{{
  "orderValue": average order value (KRW, number only),
  "purchaseFrequency": purchase frequency (times, number only, decimals allowed)
}}

Guidelines:
- Average order value is the typical amount spent per purchase of this product
- Purchase frequency is how many times a customer is expected to buy over their lifetime (between 1 and 10)
{PLAIN_NUMBERS}"#
    )
}

fn cac_prompt(product_name: &str) -> String {
    format!(
        r#"You are an e-commerce marketing expert. Estimate the customer acquisition cost (CAC) for the given product.

Product name: {product_name}

{JSON_ONLY}
{{
  "cac": customer acquisition cost (KRW, number only)
}}

Guidelines:
- CAC is the total cost of acquiring one customer, advertising included
- It is typically 10-30% of the average order value
{PLAIN_NUMBERS}"#
    )
}

fn break_even_prompt(product_name: &str) -> String {
    format!(
        r#"You are a business analysis expert. Estimate the inputs needed to calculate the break-even point for the given product.

Product name: {product_name}

{JSON_ONLY}
{{
  "fixedCost": total fixed cost (KRW per month, number only),
  "variableCost": variable cost per unit (KRW, number only),
  "sellingPrice": selling price per unit (KRW, number only)
}}

Guidelines:
- Fixed cost covers monthly rent, payroll, overhead and similar (between 1,000,000 and 10,000,000 KRW)
- Variable cost is the per-unit cost of goods and materials (roughly 50-70% of the selling price)
- Estimate a realistic selling price based on the market
{PLAIN_NUMBERS}"#
    )
}
