use crate::domain::ports::Parser;
use crate::utils::error::Result;

/// Drives a parser through its full lifecycle in the only supported
/// order: parse, validate, save, clean.
pub struct ParserEngine<P: Parser> {
    parser: P,
}

impl<P: Parser> ParserEngine<P> {
    pub fn new(parser: P) -> Self {
        Self { parser }
    }

    pub async fn run(&mut self, input: P::Input) -> Result<P::Output> {
        tracing::info!("Parsing input");
        let output = self.parser.parse(input).await?;

        tracing::info!("Validating parsed records");
        self.parser.validate(&output).await?;

        tracing::info!("Saving validated records");
        self.parser.save(&output).await?;

        self.parser.clean();
        tracing::info!("Parser run complete");

        Ok(output)
    }

    pub fn into_inner(self) -> P {
        self.parser
    }
}
