use async_trait::async_trait;
use serde_json::Value;

use super::{Function, FunctionError, Params};

/// Returns the request parameters as the result
pub struct EchoFunction;

#[async_trait]
impl Function for EchoFunction {
    fn name(&self) -> &str {
        "echo"
    }

    async fn call(&self, params: Params) -> Result<Value, FunctionError> {
        Ok(Value::Object(params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_echo_returns_params() {
        let params = json!({"x": 1, "nested": {"y": [true, null]}});
        let Value::Object(map) = params.clone() else {
            unreachable!()
        };
        assert_eq!(EchoFunction.call(map).await.unwrap(), params);
    }
}
