//! Key names of the input grammar.

pub mod args {
    pub const WHERE: &str = "where";
    pub const DATA: &str = "data";
    pub const SELECT: &str = "select";
    pub const INCLUDE: &str = "include";

    // upsert args
    pub const CREATE: &str = "create";
    pub const UPDATE: &str = "update";

    // pagination args
    pub const CURSOR: &str = "cursor";
    pub const TAKE: &str = "take";
    pub const SKIP: &str = "skip";
    pub const DISTINCT: &str = "distinct";

    // sorting args
    pub const ORDER_BY: &str = "orderBy";
    pub const FIELD: &str = "field";
    pub const SORT: &str = "sort";
    pub const NULLS: &str = "nulls";

    // aggregation args
    pub const BY: &str = "by";
    pub const HAVING: &str = "having";

    // createMany-specific args
    pub const SKIP_DUPLICATES: &str = "skipDuplicates";
}

pub mod operations {
    // nested operations
    pub const CONNECT: &str = "connect";
    pub const CREATE: &str = "create";
    pub const CREATE_MANY: &str = "createMany";
    pub const CONNECT_OR_CREATE: &str = "connectOrCreate";
    pub const DISCONNECT: &str = "disconnect";
    pub const UPDATE: &str = "update";
    pub const UPDATE_MANY: &str = "updateMany";
    pub const DELETE: &str = "delete";
    pub const DELETE_MANY: &str = "deleteMany";
    pub const UPSERT: &str = "upsert";
    pub const SET: &str = "set";

    // scalar lists
    pub const PUSH: &str = "push";

    // numbers
    pub const INCREMENT: &str = "increment";
    pub const DECREMENT: &str = "decrement";
    pub const MULTIPLY: &str = "multiply";
    pub const DIVIDE: &str = "divide";
}

pub mod filters {
    // scalar filters
    pub const EQUALS: &str = "equals";
    pub const CONTAINS: &str = "contains";
    pub const STARTS_WITH: &str = "startsWith";
    pub const ENDS_WITH: &str = "endsWith";
    pub const LOWER_THAN: &str = "lt";
    pub const LOWER_THAN_OR_EQUAL: &str = "lte";
    pub const GREATER_THAN: &str = "gt";
    pub const GREATER_THAN_OR_EQUAL: &str = "gte";
    pub const IN: &str = "in";
    pub const NOT_IN: &str = "notIn";
    pub const NOT: &str = "not";

    // case-sensitivity filters
    pub const MODE: &str = "mode";

    // condition filters
    pub const AND: &str = "AND";
    pub const OR: &str = "OR";
    pub const NOT_UPPER: &str = "NOT";

    // list-specific filters
    pub const HAS: &str = "has";
    pub const HAS_SOME: &str = "hasSome";
    pub const HAS_EVERY: &str = "hasEvery";
    pub const IS_EMPTY: &str = "isEmpty";

    // to-many relation filters
    pub const EVERY: &str = "every";
    pub const SOME: &str = "some";
    pub const NONE: &str = "none";

    // to-one relation filters
    pub const IS: &str = "is";
    pub const IS_NOT: &str = "isNot";
}

pub mod aggregations {
    pub const UNDERSCORE_COUNT: &str = "_count";
    pub const UNDERSCORE_AVG: &str = "_avg";
    pub const UNDERSCORE_SUM: &str = "_sum";
    pub const UNDERSCORE_MIN: &str = "_min";
    pub const UNDERSCORE_MAX: &str = "_max";
    pub const UNDERSCORE_ALL: &str = "_all";
}
