//! Normalization-style operators that update running statistics in place
//! only while in training mode

use super::RuleTable;
use opinfo_schema::OperatorName;

/// (operator, overload, mode flag, buffers written while the flag is set)
pub const TRAINING_OPS: &[(&str, &str, &str, &[&str])] = &[
    ("aten::batch_norm", "", "training", &["running_mean", "running_var"]),
    ("aten::instance_norm", "", "use_input_stats", &["running_mean", "running_var"]),
    ("aten::native_batch_norm", "", "training", &["running_mean", "running_var"]),
    ("aten::_batch_norm_impl_index", "", "training", &["running_mean", "running_var"]),
    ("aten::cudnn_batch_norm", "", "training", &["running_mean", "running_var"]),
    ("aten::miopen_batch_norm", "", "training", &["running_mean", "running_var"]),
    ("aten::rrelu_with_noise", "", "training", &["noise"]),
];

pub(super) fn register(table: &mut RuleTable) {
    for (name, overload, flag, buffers) in TRAINING_OPS {
        table.register_shared(
            OperatorName::new(*name, *overload),
            RuleTable::training_flag_rule(*flag, buffers.iter().copied()),
        );
    }
}
