//! The comparison rewriting pass.

use std::{
    collections::BTreeMap,
    panic::{catch_unwind, AssertUnwindSafe},
};

use log::{debug, warn};
use rayon::prelude::*;

use crate::{
    assembly::{decode_stream, opcodes, Instruction, InstructionEncoder, Operand},
    rewriter::{
        DispatcherRefs, ExceptionHandler, MethodBody, RewriteStats, RewrittenMethod,
    },
    Error, Result,
};

/// Rewriting behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteConfig {
    /// Internal-name prefixes of classes that are never rewritten
    pub excluded_prefixes: Vec<String>,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RewriteConfig {
    /// Excludes this crate's own runtime namespace.
    #[must_use]
    pub fn new() -> Self {
        Self {
            excluded_prefixes: vec!["pathcond/".to_string()],
        }
    }

    /// Also exclude classes starting with `prefix`.
    #[must_use]
    pub fn exclude(mut self, prefix: impl Into<String>) -> Self {
        self.excluded_prefixes.push(prefix.into());
        self
    }
}

/// Outcome of rewriting one class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transformation {
    /// Leave the class as it was loaded.
    Unchanged,
    /// One entry per input method, `None` where the method needed no change.
    Rewritten(Vec<Option<RewrittenMethod>>),
}

impl Transformation {
    /// Returns true if the class must be left as loaded.
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Transformation::Unchanged)
    }

    /// Summed counters over all rewritten methods.
    #[must_use]
    pub fn stats(&self) -> RewriteStats {
        let mut stats = RewriteStats::default();
        if let Transformation::Rewritten(methods) = self {
            for method in methods.iter().flatten() {
                stats += method.stats;
            }
        }
        stats
    }
}

/// Replaces comparison instructions with dispatcher calls.
///
/// - `lcmp`, `fcmpl`, `fcmpg`, `dcmpl`, `dcmpg` become `invokestatic` of the matching entry
///   point, which has the same stack effect.
/// - `if_icmp<cond>` and `if_acmp<cond>` become: push the relation selector,
///   `invokestatic icmp_jump`/`acmp_jump`, `ifne <original target>`.
///
/// All other instructions are copied, with branch displacements and switch padding recomputed
/// for their new positions.
///
/// # Example
///
/// ```rust
/// use pathcond::rewriter::{DispatcherRefs, MethodBody, RewriteConfig, Rewriter};
///
/// let refs = DispatcherRefs::from_indices("pathcond/runtime/Dispatch", [10, 11, 12, 13, 14, 15, 16]);
/// let rewriter = Rewriter::new(refs, RewriteConfig::default());
///
/// // dload_0; dload_2; dcmpl; ireturn
/// let body = MethodBody::new(vec![0x26, 0x28, 0x97, 0xAC], 4, 4);
/// let rewritten = rewriter.rewrite_method(&body)?.expect("contains a compare");
///
/// assert_eq!(rewritten.body.code, vec![0x26, 0x28, 0xB8, 0x00, 0x0D, 0xAC]);
/// assert!(rewriter.rewrite_method(&rewritten.body)?.is_none());
/// # Ok::<(), pathcond::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Rewriter {
    refs: DispatcherRefs,
    config: RewriteConfig,
}

impl Rewriter {
    /// Create a rewriter emitting calls through `refs`.
    #[must_use]
    pub fn new(refs: DispatcherRefs, config: RewriteConfig) -> Self {
        Self { refs, config }
    }

    /// The dispatcher references in use.
    #[must_use]
    pub fn refs(&self) -> &DispatcherRefs {
        &self.refs
    }

    /// Returns true if `class_name` must never be rewritten.
    ///
    /// Covers the dispatcher's own package and every configured prefix. Rewriting these
    /// would make the dispatcher call itself.
    #[must_use]
    pub fn is_excluded(&self, class_name: &str) -> bool {
        if class_name == self.refs.owner {
            return true;
        }
        let package = self.refs.owner_package();
        if !package.is_empty() && class_name.starts_with(package) {
            return true;
        }
        self.config
            .excluded_prefixes
            .iter()
            .any(|prefix| class_name.starts_with(prefix.as_str()))
    }

    /// Rewrite one method body.
    ///
    /// Returns `None` if the body contains no comparison to replace, which includes bodies
    /// that were already rewritten.
    ///
    /// # Errors
    ///
    /// Fails on undecodable code, on branch displacements that no longer fit their encoding,
    /// and on exception-table offsets that do not start an instruction.
    pub fn rewrite_method(&self, body: &MethodBody) -> Result<Option<RewrittenMethod>> {
        let instructions = decode_stream(&body.code)?;
        if !instructions
            .iter()
            .any(|i| i.is_ordered_compare() || i.branch_relation().is_some())
        {
            return Ok(None);
        }

        let mut encoder = InstructionEncoder::new();
        let mut stats = RewriteStats::default();

        for instruction in &instructions {
            encoder.define_label(instruction.offset)?;
            self.emit(&mut encoder, instruction, &body.code, &mut stats)?;
        }
        let code_length =
            u32::try_from(body.code.len()).map_err(|_| malformed_error!("Code too large"))?;
        encoder.define_label(code_length)?;

        let (code, labels) = encoder.finalize()?;
        let offset_map: BTreeMap<u32, u32> = labels.into_iter().collect();

        let exception_table = body
            .exception_table
            .iter()
            .map(|handler| remap_handler(handler, &offset_map))
            .collect::<Result<Vec<_>>>()?;

        let max_stack = if stats.branches > 0 {
            body.max_stack
                .checked_add(1)
                .ok_or_else(|| malformed_error!("max_stack overflow"))?
        } else {
            body.max_stack
        };

        debug!(
            "rewrote {} ordered compares and {} branches, code {} -> {} bytes",
            stats.ordered_compares,
            stats.branches,
            body.code.len(),
            code.len()
        );

        Ok(Some(RewrittenMethod {
            body: MethodBody {
                code,
                max_stack,
                max_locals: body.max_locals,
                exception_table,
            },
            offset_map,
            stats,
        }))
    }

    /// Rewrite every method of a class, all or nothing.
    ///
    /// Excluded classes, classes without comparisons, and classes where any method fails to
    /// rewrite (including by panicking) yield [`Transformation::Unchanged`].
    #[must_use]
    pub fn transform_class(&self, class_name: &str, methods: &[MethodBody]) -> Transformation {
        if self.is_excluded(class_name) {
            debug!("skipping excluded class {class_name}");
            return Transformation::Unchanged;
        }

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            methods
                .iter()
                .map(|method| self.rewrite_method(method))
                .collect::<Result<Vec<_>>>()
        }));

        match outcome {
            Ok(Ok(rewritten)) if rewritten.iter().any(Option::is_some) => {
                let transformation = Transformation::Rewritten(rewritten);
                let stats = transformation.stats();
                debug!(
                    "rewrote class {class_name}: {} ordered compares, {} branches",
                    stats.ordered_compares, stats.branches
                );
                transformation
            }
            Ok(Ok(_)) => Transformation::Unchanged,
            Ok(Err(error)) => {
                warn!("leaving class {class_name} unchanged: {error}");
                Transformation::Unchanged
            }
            Err(_) => {
                warn!("leaving class {class_name} unchanged: rewriter panicked");
                Transformation::Unchanged
            }
        }
    }

    /// [`Rewriter::transform_class`] over many classes in parallel.
    ///
    /// Results are in input order.
    #[must_use]
    pub fn transform_batch(&self, classes: &[(String, Vec<MethodBody>)]) -> Vec<Transformation> {
        classes
            .par_iter()
            .map(|(name, methods)| self.transform_class(name, methods))
            .collect()
    }

    fn emit(
        &self,
        encoder: &mut InstructionEncoder,
        instruction: &Instruction,
        code: &[u8],
        stats: &mut RewriteStats,
    ) -> Result<()> {
        if let Some(index) = self.refs.ordered_compare(instruction.opcode) {
            encoder.emit_invokestatic(index);
            stats.ordered_compares += 1;
            return Ok(());
        }

        if let Some(relation) = instruction.branch_relation() {
            let Operand::Target(target) = instruction.operand else {
                return Err(malformed_error!(
                    "Branch at {} has no target",
                    instruction.offset
                ));
            };
            encoder.emit_int_constant(relation.selector())?;
            encoder.emit_invokestatic(if relation.is_reference() {
                self.refs.acmp_jump
            } else {
                self.refs.icmp_jump
            });
            encoder.emit_branch(opcodes::IFNE, target)?;
            stats.branches += 1;
            return Ok(());
        }

        match &instruction.operand {
            Operand::Target(target) => encoder.emit_branch(instruction.opcode, *target),
            Operand::TableSwitch {
                default,
                low,
                high,
                targets,
            } => encoder.emit_table_switch(*default, *low, *high, targets),
            Operand::LookupSwitch { default, pairs } => {
                encoder.emit_lookup_switch(*default, pairs)
            }
            _ => {
                let start = instruction.offset as usize;
                let end = instruction.next_offset() as usize;
                let bytes = code.get(start..end).ok_or(out_of_bounds_error!())?;
                encoder.emit_bytes(bytes);
                Ok(())
            }
        }
    }
}

fn remap_handler(
    handler: &ExceptionHandler,
    offset_map: &BTreeMap<u32, u32>,
) -> Result<ExceptionHandler> {
    let remap = |pc: u16| -> Result<u16> {
        let new = offset_map.get(&u32::from(pc)).ok_or_else(|| {
            malformed_error!("Exception table offset {} is not an instruction boundary", pc)
        })?;
        u16::try_from(*new).map_err(|_| Error::BranchOutOfRange {
            offset: i64::from(*new),
            size: 2,
        })
    };

    Ok(ExceptionHandler {
        start_pc: remap(handler.start_pc)?,
        end_pc: remap(handler.end_pc)?,
        handler_pc: remap(handler.handler_pc)?,
        catch_type: handler.catch_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assembly::{decode_stream, FlowType},
        test::{dispatcher_refs, REF_ACMP_JUMP, REF_DCMPL, REF_ICMP_JUMP, REF_LCMP},
    };

    fn rewriter() -> Rewriter {
        Rewriter::new(dispatcher_refs(), RewriteConfig::default())
    }

    #[test]
    fn test_no_comparisons_is_none() -> Result<()> {
        // iload_0; iconst_1; iadd; ireturn
        let body = MethodBody::new(vec![0x1A, 0x04, 0x60, 0xAC], 2, 1);
        assert!(rewriter().rewrite_method(&body)?.is_none());
        Ok(())
    }

    #[test]
    fn test_ordered_compare_replaced() -> Result<()> {
        // lload_0; lload_2; lcmp; ifle +5; iconst_1; ireturn; iconst_0; ireturn
        let body = MethodBody::new(
            vec![0x1E, 0x20, 0x94, 0x9E, 0x00, 0x05, 0x04, 0xAC, 0x03, 0xAC],
            4,
            4,
        );
        let rewritten = rewriter().rewrite_method(&body)?.unwrap();

        let [hi, lo] = REF_LCMP.to_be_bytes();
        assert_eq!(
            rewritten.body.code,
            vec![0x1E, 0x20, 0xB8, hi, lo, 0x9E, 0x00, 0x05, 0x04, 0xAC, 0x03, 0xAC]
        );
        assert_eq!(rewritten.body.max_stack, 4);
        assert_eq!(rewritten.stats.ordered_compares, 1);
        assert_eq!(rewritten.map_offset(3), Some(5));
        assert_eq!(rewritten.map_offset(10), Some(12));
        Ok(())
    }

    #[test]
    fn test_branch_replaced_with_selector_call() -> Result<()> {
        // 0: iload_0; 1: iload_1; 2: if_icmpgt +5 (-> 7); 5: iconst_0; 6: ireturn; 7: iconst_1; 8: ireturn
        let body = MethodBody::new(
            vec![0x1A, 0x1B, 0xA3, 0x00, 0x05, 0x03, 0xAC, 0x04, 0xAC],
            2,
            2,
        );
        let rewritten = rewriter().rewrite_method(&body)?.unwrap();
        let code = &rewritten.body.code;

        let instructions = decode_stream(code)?;
        let mnemonics: Vec<_> = instructions.iter().map(|i| i.mnemonic).collect();
        assert_eq!(
            mnemonics,
            vec![
                "iload_0",
                "iload_1",
                "iconst_4",
                "invokestatic",
                "ifne",
                "iconst_0",
                "ireturn",
                "iconst_1",
                "ireturn"
            ]
        );
        assert_eq!(instructions[3].operand, Operand::ConstantPool(REF_ICMP_JUMP));
        assert_eq!(instructions[4].flow_type, FlowType::ConditionalBranch);
        assert_eq!(
            instructions[4].operand,
            Operand::Target(rewritten.map_offset(7).unwrap())
        );
        assert_eq!(rewritten.body.max_stack, 3);
        assert_eq!(rewritten.stats.branches, 1);
        Ok(())
    }

    #[test]
    fn test_reference_branch_uses_acmp_entry() -> Result<()> {
        // aload_0; aload_1; if_acmpne +4; return; return
        let body = MethodBody::new(vec![0x2A, 0x2B, 0xA6, 0x00, 0x04, 0xB1, 0xB1], 2, 2);
        let rewritten = rewriter().rewrite_method(&body)?.unwrap();
        let instructions = decode_stream(&rewritten.body.code)?;

        assert_eq!(instructions[2].opcode, opcodes::BIPUSH);
        assert_eq!(instructions[2].operand, Operand::Int(7));
        assert_eq!(instructions[3].operand, Operand::ConstantPool(REF_ACMP_JUMP));
        Ok(())
    }

    #[test]
    fn test_backward_branch_and_switch_relocated() -> Result<()> {
        // 0: iload_0; 1: iload_1; 2: if_icmplt -2 (-> 0); 5: iload_0;
        // 6: tableswitch (1 pad byte) default -> 24, 0..=0 -> 0; 24: return
        let mut code = vec![0x1A, 0x1B, 0xA1, 0xFF, 0xFE, 0x1A, 0xAA, 0x00];
        code.extend_from_slice(&18i32.to_be_bytes());
        code.extend_from_slice(&0i32.to_be_bytes());
        code.extend_from_slice(&0i32.to_be_bytes());
        code.extend_from_slice(&(-6i32).to_be_bytes());
        code.push(0xB1);
        assert_eq!(code.len(), 25);

        let body = MethodBody::new(code, 2, 2);
        let rewritten = rewriter().rewrite_method(&body)?.unwrap();
        let instructions = decode_stream(&rewritten.body.code)?;

        let ifne = instructions.iter().find(|i| i.opcode == opcodes::IFNE).unwrap();
        assert_eq!(ifne.operand, Operand::Target(0));

        let switch = instructions
            .iter()
            .find(|i| i.opcode == opcodes::TABLESWITCH)
            .unwrap();
        assert_eq!(switch.offset, 10);
        assert_eq!(rewritten.map_offset(24), Some(29));
        assert_eq!(
            switch.operand,
            Operand::TableSwitch {
                default: 29,
                low: 0,
                high: 0,
                targets: vec![0],
            }
        );
        Ok(())
    }

    #[test]
    fn test_exception_table_remapped() -> Result<()> {
        // 0: dload_0; 1: dload_2; 2: dcmpl; 3: ireturn; 4: astore_1; 5: iconst_0; 6: ireturn
        let body = MethodBody::new(vec![0x26, 0x28, 0x97, 0xAC, 0x4C, 0x03, 0xAC], 4, 4)
            .with_exception_table(vec![ExceptionHandler {
                start_pc: 0,
                end_pc: 4,
                handler_pc: 4,
                catch_type: 0,
            }]);
        let rewritten = rewriter().rewrite_method(&body)?.unwrap();

        let [hi, lo] = REF_DCMPL.to_be_bytes();
        assert_eq!(&rewritten.body.code[2..5], &[0xB8, hi, lo]);
        assert_eq!(
            rewritten.body.exception_table,
            vec![ExceptionHandler {
                start_pc: 0,
                end_pc: 6,
                handler_pc: 6,
                catch_type: 0,
            }]
        );
        Ok(())
    }

    #[test]
    fn test_misaligned_exception_offset_fails() {
        let body = MethodBody::new(vec![0x26, 0x28, 0x97, 0xAC], 4, 4).with_exception_table(
            vec![ExceptionHandler {
                start_pc: 0,
                end_pc: 2,
                handler_pc: 9,
                catch_type: 0,
            }],
        );
        assert!(rewriter().rewrite_method(&body).is_err());
    }

    #[test]
    fn test_rewrite_is_idempotent() -> Result<()> {
        let body = MethodBody::new(
            vec![0x1A, 0x1B, 0xA3, 0x00, 0x05, 0x03, 0xAC, 0x04, 0xAC],
            2,
            2,
        );
        let once = rewriter().rewrite_method(&body)?.unwrap();
        assert!(rewriter().rewrite_method(&once.body)?.is_none());
        Ok(())
    }

    #[test]
    fn test_overflowing_branch_leaves_class_unchanged() {
        // goto over 20000 lcmp instructions, each of which grows to 3 bytes
        let count = 20_000;
        let mut code = vec![opcodes::GOTO];
        code.extend_from_slice(&i16::try_from(count + 3).unwrap().to_be_bytes());
        code.extend(std::iter::repeat(opcodes::LCMP).take(usize::try_from(count).unwrap()));
        code.push(opcodes::RETURN);

        let rewriter = rewriter();
        let body = MethodBody::new(code, 4, 4);
        assert!(matches!(
            rewriter.rewrite_method(&body),
            Err(Error::BranchOutOfRange { size: 2, .. })
        ));
        assert!(rewriter.transform_class("app/Main", &[body]).is_unchanged());
    }

    #[test]
    fn test_excluded_classes() {
        let rewriter = Rewriter::new(
            dispatcher_refs(),
            RewriteConfig::default().exclude("java/lang/"),
        );
        assert!(rewriter.is_excluded("pathcond/runtime/Dispatch"));
        assert!(rewriter.is_excluded("pathcond/symbolic/Manager"));
        assert!(rewriter.is_excluded("java/lang/Math"));
        assert!(!rewriter.is_excluded("app/Main"));

        let body = MethodBody::new(vec![0x26, 0x28, 0x97, 0xAC], 4, 4);
        assert!(rewriter
            .transform_class("pathcond/runtime/Dispatch", &[body])
            .is_unchanged());
    }

    #[test]
    fn test_transform_class_all_or_nothing() {
        let good = MethodBody::new(vec![0x26, 0x28, 0x97, 0xAC], 4, 4);
        let plain = MethodBody::new(vec![0xB1], 0, 0);
        let broken = MethodBody::new(vec![0x1A, 0xA3, 0x00], 2, 1);

        let rewriter = rewriter();
        match rewriter.transform_class("app/Ok", &[good.clone(), plain.clone()]) {
            Transformation::Rewritten(methods) => {
                assert_eq!(methods.len(), 2);
                assert!(methods[0].is_some());
                assert!(methods[1].is_none());
            }
            Transformation::Unchanged => panic!("expected rewrite"),
        }

        assert!(rewriter
            .transform_class("app/Broken", &[good, broken])
            .is_unchanged());
        assert!(rewriter.transform_class("app/Plain", &[plain]).is_unchanged());
    }

    #[test]
    fn test_transform_batch_preserves_order() {
        let compare = MethodBody::new(vec![0x26, 0x28, 0x97, 0xAC], 4, 4);
        let plain = MethodBody::new(vec![0xB1], 0, 0);
        let classes: Vec<(String, Vec<MethodBody>)> = (0..16)
            .map(|i| {
                let body = if i % 2 == 0 { compare.clone() } else { plain.clone() };
                (format!("app/C{i}"), vec![body])
            })
            .collect();

        let results = rewriter().transform_batch(&classes);
        assert_eq!(results.len(), 16);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.is_unchanged(), i % 2 == 1, "class {i}");
        }
    }
}
