//! Payment field chain for insurance purchases.
//!
//! The signer enters coverage and deductible; the platform computes the
//! discount, the total and the charged amount from the formulas below.
//! Fields reference each other by tab label, so the labels are fixed.

use tracing::debug;

use super::{
    Anchor, ConditionalParent, FieldBase, FieldDescriptor, FontStyle, FormulaField,
    PaymentDetails, PaymentLineItem, StyledField,
};
use crate::config::{GatewayConfig, PaymentConfig};

pub const COVERAGE_LABEL: &str = "l1e";
pub const DEDUCTIBLE_LABEL: &str = "l2e";
pub const CHECKBOX_LABEL: &str = "checkbox";
pub const TRIGGER_LABEL: &str = "trigger";
pub const DISCOUNT_LABEL: &str = "discount";
pub const TOTAL_LABEL: &str = "l4t";
pub const PAYMENT_LABEL: &str = "payment";

/// Value a ticked checkbox reports to its conditional children.
const CHECKBOX_ON: &str = "on";

const LINE_ITEM_NAME: &str = "Insurance payment";

/// Builds the seven payment fields from pricing constants.
#[derive(Debug, Clone, Copy, Default)]
pub struct PaymentFormulaBuilder {
    config: PaymentConfig,
}

impl PaymentFormulaBuilder {
    pub fn new(config: PaymentConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PaymentConfig {
        &self.config
    }

    /// Coverage, deductible, checkbox, trigger, discount, total and payment,
    /// in that order.
    pub fn build_payment_fields(&self, gateway: &GatewayConfig) -> Vec<FieldDescriptor> {
        debug!(
            rate = self.config.insurance_rate_percent,
            discount = self.config.discount_percent,
            multiplier = self.config.currency_multiplier,
            "Building payment fields"
        );

        vec![
            self.coverage(),
            self.deductible(),
            self.checkbox(),
            self.trigger(),
            self.discount(),
            self.total(),
            self.payment(gateway),
        ]
    }

    fn coverage(&self) -> FieldDescriptor {
        amount_entry("/l1e/", COVERAGE_LABEL)
    }

    fn deductible(&self) -> FieldDescriptor {
        amount_entry("/l2e/", DEDUCTIBLE_LABEL)
    }

    fn checkbox(&self) -> FieldDescriptor {
        FieldDescriptor::Checkbox(StyledField {
            base: FieldBase::anchored(Anchor::new("/cb/").x(-8).y(-4)).labelled(CHECKBOX_LABEL),
            font: FontStyle::helvetica("size11").bold(),
            height: Some(50),
        })
    }

    /// Hidden helper that evaluates to 1 only while the checkbox is ticked.
    fn trigger(&self) -> FieldDescriptor {
        FieldDescriptor::Formula(FormulaField {
            base: FieldBase::anchored(Anchor::new("/trigger/").y(10))
                .labelled(TRIGGER_LABEL)
                .required()
                .locked(),
            font: FontStyle::default().color("white"),
            formula: "1".to_string(),
            conditional: Some(ConditionalParent {
                conditional_parent_label: CHECKBOX_LABEL.to_string(),
                conditional_parent_value: CHECKBOX_ON.to_string(),
            }),
            round_decimal_places: None,
            hidden: false,
            payment_details: None,
        })
    }

    fn discount(&self) -> FieldDescriptor {
        FieldDescriptor::Formula(FormulaField {
            base: FieldBase::anchored(Anchor::new("/dt/").x(0).y(-4))
                .labelled(DISCOUNT_LABEL)
                .locked(),
            font: FontStyle::helvetica("size11").bold(),
            formula: format!(
                "if([{}] > 0, {}, 0)",
                TRIGGER_LABEL, self.config.discount_percent
            ),
            conditional: None,
            round_decimal_places: Some(0),
            hidden: false,
            payment_details: None,
        })
    }

    fn total(&self) -> FieldDescriptor {
        let total = format!(
            "([{}]-[{}]) * {}/100",
            COVERAGE_LABEL, DEDUCTIBLE_LABEL, self.config.insurance_rate_percent
        );

        FieldDescriptor::Formula(FormulaField {
            base: FieldBase::anchored(Anchor::new("/l4t/").x(84).y(-6))
                .labelled(TOTAL_LABEL)
                .required()
                .locked(),
            font: FontStyle::helvetica("size12").bold(),
            formula: format!(
                "({total}) - (({total}) * [{discount}]/100)",
                total = total,
                discount = DISCOUNT_LABEL
            ),
            conditional: None,
            round_decimal_places: Some(2),
            hidden: false,
            payment_details: None,
        })
    }

    /// Hidden field carrying the gateway charge in minor units.
    fn payment(&self, gateway: &GatewayConfig) -> FieldDescriptor {
        FieldDescriptor::Formula(FormulaField {
            base: FieldBase::positioned(0, 0)
                .labelled(PAYMENT_LABEL)
                .required()
                .locked(),
            font: FontStyle::default(),
            formula: format!("([{}]) * {}", TOTAL_LABEL, self.config.currency_multiplier),
            conditional: None,
            round_decimal_places: Some(2),
            hidden: true,
            payment_details: Some(PaymentDetails {
                gateway_account_id: gateway.account_id.clone(),
                gateway_name: gateway.name.clone(),
                gateway_display_name: gateway.display_name.clone(),
                currency_code: gateway.currency_code.clone(),
                line_items: vec![PaymentLineItem {
                    name: LINE_ITEM_NAME.to_string(),
                    description: format!("$[{}]", TOTAL_LABEL),
                    amount_reference: TOTAL_LABEL.to_string(),
                }],
            }),
        })
    }
}

fn amount_entry(anchor: &str, label: &str) -> FieldDescriptor {
    FieldDescriptor::Number(StyledField {
        base: FieldBase::anchored(Anchor::new(anchor).y(-7))
            .labelled(label)
            .required(),
        font: FontStyle::helvetica("size11"),
        height: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldKind;
    use std::collections::HashMap;

    /// Minimal evaluator for the platform's formula syntax: numbers, `[label]`
    /// references, `+ - * /`, `>`/`<`, parentheses and `if(c, a, b)`.
    struct Formula<'a> {
        chars: Vec<char>,
        pos: usize,
        values: &'a HashMap<String, f64>,
    }

    impl<'a> Formula<'a> {
        fn eval(source: &str, values: &'a HashMap<String, f64>) -> f64 {
            let mut parser = Formula {
                chars: source.chars().collect(),
                pos: 0,
                values,
            };
            let value = parser.comparison();
            parser.skip_ws();
            assert_eq!(parser.pos, parser.chars.len(), "trailing input in {}", source);
            value
        }

        fn skip_ws(&mut self) {
            while self.chars.get(self.pos).map_or(false, |c| c.is_whitespace()) {
                self.pos += 1;
            }
        }

        fn peek(&mut self) -> Option<char> {
            self.skip_ws();
            self.chars.get(self.pos).copied()
        }

        fn expect(&mut self, c: char) {
            assert_eq!(self.peek(), Some(c));
            self.pos += 1;
        }

        fn comparison(&mut self) -> f64 {
            let lhs = self.sum();
            match self.peek() {
                Some('>') => {
                    self.pos += 1;
                    (lhs > self.sum()) as u8 as f64
                }
                Some('<') => {
                    self.pos += 1;
                    (lhs < self.sum()) as u8 as f64
                }
                _ => lhs,
            }
        }

        fn sum(&mut self) -> f64 {
            let mut acc = self.product();
            loop {
                match self.peek() {
                    Some('+') => {
                        self.pos += 1;
                        acc += self.product();
                    }
                    Some('-') => {
                        self.pos += 1;
                        acc -= self.product();
                    }
                    _ => return acc,
                }
            }
        }

        fn product(&mut self) -> f64 {
            let mut acc = self.unary();
            loop {
                match self.peek() {
                    Some('*') => {
                        self.pos += 1;
                        acc *= self.unary();
                    }
                    Some('/') => {
                        self.pos += 1;
                        acc /= self.unary();
                    }
                    _ => return acc,
                }
            }
        }

        fn unary(&mut self) -> f64 {
            if self.peek() == Some('-') {
                self.pos += 1;
                return -self.unary();
            }
            self.primary()
        }

        fn primary(&mut self) -> f64 {
            match self.peek() {
                Some('(') => {
                    self.pos += 1;
                    let value = self.comparison();
                    self.expect(')');
                    value
                }
                Some('[') => {
                    self.pos += 1;
                    let start = self.pos;
                    while self.chars[self.pos] != ']' {
                        self.pos += 1;
                    }
                    let label: String = self.chars[start..self.pos].iter().collect();
                    self.pos += 1;
                    *self.values.get(&label).unwrap_or(&0.0)
                }
                Some('i') => {
                    self.pos += 2;
                    self.expect('(');
                    let condition = self.comparison();
                    self.expect(',');
                    let then = self.comparison();
                    self.expect(',');
                    let otherwise = self.comparison();
                    self.expect(')');
                    if condition != 0.0 {
                        then
                    } else {
                        otherwise
                    }
                }
                _ => {
                    let start = self.pos;
                    while self
                        .chars
                        .get(self.pos)
                        .map_or(false, |c| c.is_ascii_digit() || *c == '.')
                    {
                        self.pos += 1;
                    }
                    let text: String = self.chars[start..self.pos].iter().collect();
                    text.parse().unwrap()
                }
            }
        }
    }

    fn formulas(fields: &[FieldDescriptor]) -> HashMap<&str, &FormulaField> {
        fields
            .iter()
            .filter_map(|f| match f {
                FieldDescriptor::Formula(formula) => {
                    Some((formula.base.tab_label.as_deref().unwrap(), formula))
                }
                _ => None,
            })
            .collect()
    }

    fn round(value: f64, places: u8) -> f64 {
        let factor = 10f64.powi(places as i32);
        (value * factor).round() / factor
    }

    /// Evaluate the chain the way the platform would, returning (total, payment).
    fn evaluate(coverage: f64, deductible: f64, checked: bool) -> (f64, f64) {
        let fields = PaymentFormulaBuilder::default()
            .build_payment_fields(&GatewayConfig::new("gw", "Stripe"));
        let formulas = formulas(&fields);

        let mut values = HashMap::new();
        values.insert(COVERAGE_LABEL.to_string(), coverage);
        values.insert(DEDUCTIBLE_LABEL.to_string(), deductible);

        for label in [TRIGGER_LABEL, DISCOUNT_LABEL, TOTAL_LABEL, PAYMENT_LABEL] {
            let field = formulas[label];
            let active = match &field.conditional {
                Some(parent) => {
                    parent.conditional_parent_label == CHECKBOX_LABEL
                        && checked == (parent.conditional_parent_value == CHECKBOX_ON)
                }
                None => true,
            };
            let mut value = if active {
                Formula::eval(&field.formula, &values)
            } else {
                0.0
            };
            if let Some(places) = field.round_decimal_places {
                value = round(value, places);
            }
            values.insert(label.to_string(), value);
        }

        (values[TOTAL_LABEL], values[PAYMENT_LABEL])
    }

    #[test]
    fn test_field_order_and_kinds() {
        let fields = PaymentFormulaBuilder::default()
            .build_payment_fields(&GatewayConfig::new("gw", "Stripe"));
        let kinds: Vec<_> = fields.iter().map(FieldDescriptor::kind).collect();
        assert_eq!(
            kinds,
            vec![
                FieldKind::Number,
                FieldKind::Number,
                FieldKind::Checkbox,
                FieldKind::Formula,
                FieldKind::Formula,
                FieldKind::Formula,
                FieldKind::Formula,
            ]
        );
        let labels: Vec<_> = fields.iter().filter_map(FieldDescriptor::tab_label).collect();
        assert_eq!(
            labels,
            vec!["l1e", "l2e", "checkbox", "trigger", "discount", "l4t", "payment"]
        );
    }

    #[test]
    fn test_default_formulas() {
        let fields = PaymentFormulaBuilder::default()
            .build_payment_fields(&GatewayConfig::new("gw", "Stripe"));
        let formulas = formulas(&fields);

        assert_eq!(formulas["trigger"].formula, "1");
        assert_eq!(formulas["discount"].formula, "if([trigger] > 0, 5, 0)");
        assert_eq!(
            formulas["l4t"].formula,
            "(([l1e]-[l2e]) * 10/100) - ((([l1e]-[l2e]) * 10/100) * [discount]/100)"
        );
        assert_eq!(formulas["payment"].formula, "([l4t]) * 100");
        assert_eq!(formulas["discount"].round_decimal_places, Some(0));
        assert_eq!(formulas["l4t"].round_decimal_places, Some(2));
    }

    #[test]
    fn test_custom_config_reaches_formulas() {
        let builder = PaymentFormulaBuilder::new(PaymentConfig {
            currency_multiplier: 1000,
            discount_percent: 15,
            insurance_rate_percent: 7,
        });
        let fields = builder.build_payment_fields(&GatewayConfig::new("gw", "Stripe"));
        let formulas = formulas(&fields);
        assert_eq!(formulas["discount"].formula, "if([trigger] > 0, 15, 0)");
        assert!(formulas["l4t"].formula.contains("* 7/100"));
        assert_eq!(formulas["payment"].formula, "([l4t]) * 1000");
    }

    #[test]
    fn test_trigger_depends_on_checkbox() {
        let fields = PaymentFormulaBuilder::default()
            .build_payment_fields(&GatewayConfig::new("gw", "Stripe"));
        let trigger = formulas(&fields)["trigger"];
        let parent = trigger.conditional.as_ref().unwrap();
        assert_eq!(parent.conditional_parent_label, "checkbox");
        assert_eq!(parent.conditional_parent_value, "on");
        assert_eq!(trigger.font.font_color.as_deref(), Some("white"));
        assert!(trigger.base.locked);
    }

    #[test]
    fn test_payment_field_wire_shape() {
        let gateway = GatewayConfig::new("gw-123", "Stripe").with_display_name("Card");
        let fields = PaymentFormulaBuilder::default().build_payment_fields(&gateway);
        let payment = formulas(&fields)["payment"];

        let json = serde_json::to_value(payment).unwrap();
        assert_eq!(json["hidden"], "true");
        assert_eq!(json["required"], "true");
        assert_eq!(json["locked"], "true");
        assert_eq!(json["documentId"], "1");
        assert_eq!(json["pageNumber"], "1");
        assert_eq!(json["xPosition"], "0");
        assert_eq!(json["yPosition"], "0");
        assert_eq!(json["roundDecimalPlaces"], "2");
        assert!(json.get("anchorString").is_none());

        let details = &json["paymentDetails"];
        assert_eq!(details["gatewayAccountId"], "gw-123");
        assert_eq!(details["gatewayName"], "Stripe");
        assert_eq!(details["gatewayDisplayName"], "Card");
        assert_eq!(details["currencyCode"], "USD");
        assert_eq!(details["lineItems"][0]["name"], "Insurance payment");
        assert_eq!(details["lineItems"][0]["description"], "$[l4t]");
        assert_eq!(details["lineItems"][0]["amountReference"], "l4t");
    }

    #[test]
    fn test_chain_without_discount() {
        let (total, payment) = evaluate(100.0, 20.0, false);
        assert_eq!(total, 8.0);
        assert_eq!(payment, 800.0);
    }

    #[test]
    fn test_chain_with_discount() {
        let (total, payment) = evaluate(100.0, 20.0, true);
        assert_eq!(total, 7.6);
        assert_eq!(payment, 760.0);
    }
}
