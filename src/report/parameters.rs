use std::io::Write;

use crate::error::Result;
use crate::function::{Function, NodeId};
use crate::reception::ReceptionModel;

use super::Report;

/// Parameters of every signal path and input state of a model.
pub struct ModelParametersReport<'a> {
    model: &'a ReceptionModel,
}

impl<'a> ModelParametersReport<'a> {
    pub fn new(model: &'a ReceptionModel) -> Self {
        Self { model }
    }

    fn node(&self, out: &mut dyn Write, label: &str, index: usize, id: NodeId) -> Result<()> {
        let arena = self.model.arena();
        let nparam = arena.nparam(id)?;
        writeln!(out)?;
        writeln!(
            out,
            "---- {} {} = {} with {} parameters ----",
            label,
            index,
            arena.describe(id)?,
            nparam
        )?;
        for i in 0..nparam {
            write!(
                out,
                "{}:{} {} = {}",
                i,
                u8::from(arena.infit(id, i)?),
                arena.param_name(id, i)?,
                arena.param(id, i)?
            )?;
            let variance = arena.variance(id, i)?;
            if variance > 0.0 {
                write!(out, " +/- {}", variance.sqrt())?;
            }
            writeln!(out)?;
        }
        Ok(())
    }
}

impl Report for ModelParametersReport<'_> {
    fn filename(&self) -> &str {
        "model_parameters.txt"
    }

    fn report(&self, out: &mut dyn Write) -> Result<()> {
        writeln!(out, "{} model parameters [index:free name=value]", self.model.nparam())?;
        writeln!(out, "{} unique free parameters", self.model.nparam_infit())?;
        writeln!(out, "{} input states", self.model.ninput())?;
        writeln!(out, "{} signal paths", self.model.ntransformation())?;

        for index in 0..self.model.ntransformation() {
            self.node(out, "signal path", index, self.model.transformation(index)?)?;
        }
        for index in 0..self.model.ninput() {
            self.node(out, "input state", index, self.model.input(index)?)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::test_support::solved_model;

    #[test]
    fn test_parameters_report() {
        let (model, _) = solved_model();
        let text = ModelParametersReport::new(&model).to_report_string().unwrap();
        assert!(text.starts_with("5 model parameters"));
        assert!(text.contains("2 unique free parameters"));
        assert!(text.contains("---- signal path 0 = Gain with 1 parameters ----"));
        assert!(text.contains("---- input state 0 = Coherency with 4 parameters ----"));

        let gain = text.lines().find(|l| l.starts_with("0:1 gain = ")).unwrap();
        assert!(gain.contains("+/-"));
    }
}
